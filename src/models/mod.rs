pub mod appointment;
pub mod auth;
pub mod blog;
pub mod contact;
pub mod crm;
pub mod otp;
pub mod package;
pub mod patient;
pub mod sms;
pub mod testimonial;
pub mod therapist;
pub mod treatment;
pub mod user;
