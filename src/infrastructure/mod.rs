pub mod in_memory;
pub mod wait_page;
