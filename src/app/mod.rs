pub mod explorer;
pub mod print;

pub use explorer::Explorer;
pub use print::write_tree;
