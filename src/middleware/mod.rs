pub mod paging;
pub mod redirect;
