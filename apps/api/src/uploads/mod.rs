// File intake shared by chat assets, quick apply and direct uploads.

pub mod form;
pub mod handlers;
pub mod validation;
