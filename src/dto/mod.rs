pub mod category_dto;
pub mod export_dto;
pub mod paging;
pub mod product_dto;
pub mod search_dto;
pub mod user_dto;
