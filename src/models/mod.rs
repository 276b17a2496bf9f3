pub mod category;
pub mod entity;
pub mod product;
pub mod user;

pub use category::Category;
pub use entity::{AuditFields, Entity, EntityKey};
pub use product::{Product, StockStatus};
pub use user::User;
