pub mod capture;
pub mod constants;
pub mod contact;
pub mod geometry;
pub mod layout;
pub mod outcome;
pub mod player;
pub mod rescue;
pub mod spawn;
