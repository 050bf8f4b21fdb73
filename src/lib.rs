pub mod app_config;
pub mod catalog;
pub mod db;
pub mod email;
pub mod middleware;
pub mod orm;
pub mod permission;
pub mod rating;
pub mod token;
pub mod user;
pub mod web;
