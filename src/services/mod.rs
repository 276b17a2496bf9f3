pub mod category_service;
pub mod crud_service;
pub mod export_service;
pub mod product_service;
pub mod search_service;
pub mod user_service;
