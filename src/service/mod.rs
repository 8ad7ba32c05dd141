pub mod import;
pub mod school_leavers;
pub mod users;
pub mod validation;
