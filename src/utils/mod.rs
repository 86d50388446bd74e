pub mod fs;
pub mod locate;
