pub mod school_leavers;
pub mod users;
