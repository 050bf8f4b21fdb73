//! Mailer that keeps messages in memory.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use yamdb::email::{EmailResult, Mailer, OutgoingMail};

#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<OutgoingMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> EmailResult<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}
