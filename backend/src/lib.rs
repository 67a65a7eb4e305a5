pub mod config;
pub mod db;
pub mod job_controller;
pub mod report;
pub mod services;
