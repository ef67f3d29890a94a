pub mod appointments;
pub mod auth;
pub mod blog;
pub mod contact;
pub mod crm;
pub mod otp;
pub mod otp_store;
pub mod otp_sweeper;
pub mod packages;
pub mod patients;
pub mod sms;
pub mod testimonials;
pub mod therapists;
pub mod treatment;
pub mod users;
