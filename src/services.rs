pub mod access;
pub mod accounts;
pub mod ids;
pub mod media;
pub mod projects;
pub mod summary;
pub mod updates;
