pub mod repository;
pub mod table;
pub mod unit_of_work;

pub use repository::{EntityState, Repository, Tracked};
pub use table::Table;
pub use unit_of_work::UnitOfWork;
