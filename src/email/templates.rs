/// Email template functions
use super::OutgoingMail;

pub const CONFIRMATION_SUBJECT: &str = "YaMDb confirmation code";

/// Builds the message carrying a confirmation code.
pub fn confirmation_code_email(to: &str, username: &str, code: &str) -> OutgoingMail {
    let body = format!(
        r#"Hello {},

Your confirmation code is:

{}

Exchange it for an access token at POST /api/v1/auth/token together with
your username. The code works once; request a new one by signing up again
with the same username and email.

---
YaMDb
"#,
        username, code
    );

    OutgoingMail {
        to: to.to_owned(),
        subject: CONFIRMATION_SUBJECT.to_owned(),
        body,
    }
}
