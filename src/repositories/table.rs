use async_trait::async_trait;
use sqlx::PgConnection;

use crate::database::memory::{MemoryTable, MemoryTables};
use crate::error::{Error, Result};
use crate::models::{Category, Entity, Product, User};

/// Storage mapping for an entity: its Postgres table and its slot in the
/// memory store.
#[async_trait]
pub trait Table: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static str;

    fn memory(tables: &MemoryTables) -> &MemoryTable<Self>;
    fn memory_mut(tables: &mut MemoryTables) -> &mut MemoryTable<Self>;

    /// Schema rules the memory store has to enforce itself.
    fn check_constraints(_tables: &MemoryTables, _row: &Self) -> Result<()> {
        Ok(())
    }

    async fn insert_row(conn: &mut PgConnection, row: &Self) -> Result<Self>;

    /// `None` when no row with the key exists.
    async fn update_row(conn: &mut PgConnection, row: &Self) -> Result<Option<Self>>;

    async fn select_all(conn: &mut PgConnection, include_deleted: bool) -> Result<Vec<Self>> {
        let filter = if include_deleted {
            ""
        } else {
            "WHERE is_deleted = FALSE"
        };
        let sql = format!(
            "SELECT {} FROM {} {} ORDER BY id",
            Self::COLUMNS,
            Self::TABLE,
            filter
        );
        let rows = sqlx::query_as::<_, Self>(&sql).fetch_all(conn).await?;
        Ok(rows)
    }

    async fn select_one(
        conn: &mut PgConnection,
        id: Self::Key,
        include_deleted: bool,
    ) -> Result<Option<Self>> {
        let filter = if include_deleted {
            ""
        } else {
            "AND is_deleted = FALSE"
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 {}",
            Self::COLUMNS,
            Self::TABLE,
            filter
        );
        let row = sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    fn memory_insert(tables: &mut MemoryTables, row: &Self) -> Result<Self> {
        Self::check_constraints(tables, row)?;
        Self::memory_mut(tables).insert(row.clone())
    }

    fn memory_update(tables: &mut MemoryTables, row: &Self) -> Result<Self> {
        Self::check_constraints(tables, row)?;
        Self::memory_mut(tables).replace(row.clone())
    }
}

const AUDIT_COLUMNS: &str =
    "created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by";

#[async_trait]
impl Table for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static str = "id, name, description, display_order, is_active, \
        created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by";

    fn memory(tables: &MemoryTables) -> &MemoryTable<Self> {
        &tables.categories
    }

    fn memory_mut(tables: &mut MemoryTables) -> &mut MemoryTable<Self> {
        &mut tables.categories
    }

    fn check_constraints(tables: &MemoryTables, row: &Self) -> Result<()> {
        let duplicate = tables
            .categories
            .live(false)
            .any(|other| other.id != row.id && other.name == row.name);
        if duplicate && !row.audit.is_deleted {
            return Err(Error::Constraint(format!(
                "duplicate key value violates unique constraint \"ix_categories_name\": {}",
                row.name
            )));
        }
        Ok(())
    }

    async fn insert_row(conn: &mut PgConnection, row: &Self) -> Result<Self> {
        let sql = format!(
            "INSERT INTO categories (name, description, display_order, is_active, {}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            AUDIT_COLUMNS,
            Self::COLUMNS
        );
        let saved = sqlx::query_as::<_, Self>(&sql)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.display_order)
            .bind(row.is_active)
            .bind(row.audit.created_at)
            .bind(row.audit.updated_at)
            .bind(&row.audit.created_by)
            .bind(&row.audit.updated_by)
            .bind(row.audit.is_deleted)
            .bind(row.audit.deleted_at)
            .bind(&row.audit.deleted_by)
            .fetch_one(conn)
            .await?;
        Ok(saved)
    }

    async fn update_row(conn: &mut PgConnection, row: &Self) -> Result<Option<Self>> {
        let sql = format!(
            "UPDATE categories SET name = $2, description = $3, display_order = $4, \
             is_active = $5, updated_at = $6, updated_by = $7, is_deleted = $8, \
             deleted_at = $9, deleted_by = $10 WHERE id = $1 RETURNING {}",
            Self::COLUMNS
        );
        let saved = sqlx::query_as::<_, Self>(&sql)
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.display_order)
            .bind(row.is_active)
            .bind(row.audit.updated_at)
            .bind(&row.audit.updated_by)
            .bind(row.audit.is_deleted)
            .bind(row.audit.deleted_at)
            .bind(&row.audit.deleted_by)
            .fetch_optional(conn)
            .await?;
        Ok(saved)
    }
}

#[async_trait]
impl Table for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static str = "id, name, description, price, sale_price, stock_quantity, \
        sku, is_active, is_featured, category_id, \
        created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by";

    fn memory(tables: &MemoryTables) -> &MemoryTable<Self> {
        &tables.products
    }

    fn memory_mut(tables: &mut MemoryTables) -> &mut MemoryTable<Self> {
        &mut tables.products
    }

    fn check_constraints(tables: &MemoryTables, row: &Self) -> Result<()> {
        if row.price <= rust_decimal::Decimal::ZERO {
            return Err(Error::Constraint("ck_products_price".into()));
        }
        if let Some(sale) = row.sale_price {
            if sale <= rust_decimal::Decimal::ZERO {
                return Err(Error::Constraint("ck_products_sale_price".into()));
            }
            if sale >= row.price {
                return Err(Error::Constraint("ck_products_sale_below_price".into()));
            }
        }
        if row.stock_quantity < 0 {
            return Err(Error::Constraint("ck_products_stock".into()));
        }
        if tables.categories.get(&row.category_id, true).is_none() {
            return Err(Error::Constraint(format!(
                "insert or update on table \"products\" violates foreign key constraint: category {} does not exist",
                row.category_id
            )));
        }
        if let Some(sku) = row.sku.as_deref().filter(|_| !row.audit.is_deleted) {
            let taken = tables
                .products
                .live(false)
                .any(|other| other.id != row.id && other.sku.as_deref() == Some(sku));
            if taken {
                return Err(Error::Constraint(format!(
                    "duplicate key value violates unique constraint \"ix_products_sku\": {}",
                    sku
                )));
            }
        }
        Ok(())
    }

    async fn insert_row(conn: &mut PgConnection, row: &Self) -> Result<Self> {
        let sql = format!(
            "INSERT INTO products (name, description, price, sale_price, stock_quantity, sku, \
             is_active, is_featured, category_id, {}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {}",
            AUDIT_COLUMNS,
            Self::COLUMNS
        );
        let saved = sqlx::query_as::<_, Self>(&sql)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.price)
            .bind(row.sale_price)
            .bind(row.stock_quantity)
            .bind(&row.sku)
            .bind(row.is_active)
            .bind(row.is_featured)
            .bind(row.category_id)
            .bind(row.audit.created_at)
            .bind(row.audit.updated_at)
            .bind(&row.audit.created_by)
            .bind(&row.audit.updated_by)
            .bind(row.audit.is_deleted)
            .bind(row.audit.deleted_at)
            .bind(&row.audit.deleted_by)
            .fetch_one(conn)
            .await?;
        Ok(saved)
    }

    async fn update_row(conn: &mut PgConnection, row: &Self) -> Result<Option<Self>> {
        let sql = format!(
            "UPDATE products SET name = $2, description = $3, price = $4, sale_price = $5, \
             stock_quantity = $6, sku = $7, is_active = $8, is_featured = $9, category_id = $10, \
             updated_at = $11, updated_by = $12, is_deleted = $13, deleted_at = $14, \
             deleted_by = $15 WHERE id = $1 RETURNING {}",
            Self::COLUMNS
        );
        let saved = sqlx::query_as::<_, Self>(&sql)
            .bind(row.id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(row.price)
            .bind(row.sale_price)
            .bind(row.stock_quantity)
            .bind(&row.sku)
            .bind(row.is_active)
            .bind(row.is_featured)
            .bind(row.category_id)
            .bind(row.audit.updated_at)
            .bind(&row.audit.updated_by)
            .bind(row.audit.is_deleted)
            .bind(row.audit.deleted_at)
            .bind(&row.audit.deleted_by)
            .fetch_optional(conn)
            .await?;
        Ok(saved)
    }
}

#[async_trait]
impl Table for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, email, user_name, password_hash, first_name, last_name, \
        last_login_at, is_active, \
        created_at, updated_at, created_by, updated_by, is_deleted, deleted_at, deleted_by";

    fn memory(tables: &MemoryTables) -> &MemoryTable<Self> {
        &tables.users
    }

    fn memory_mut(tables: &mut MemoryTables) -> &mut MemoryTable<Self> {
        &mut tables.users
    }

    fn check_constraints(tables: &MemoryTables, row: &Self) -> Result<()> {
        let taken = !row.audit.is_deleted
            && tables
                .users
                .live(false)
                .any(|other| other.id != row.id && other.email.eq_ignore_ascii_case(&row.email));
        if taken {
            return Err(Error::Constraint(format!(
                "duplicate key value violates unique constraint \"ix_users_email\": {}",
                row.email
            )));
        }
        Ok(())
    }

    async fn insert_row(conn: &mut PgConnection, row: &Self) -> Result<Self> {
        let id = if row.id.is_nil() {
            uuid::Uuid::new_v4()
        } else {
            row.id
        };
        let sql = format!(
            "INSERT INTO users (id, email, user_name, password_hash, first_name, last_name, \
             last_login_at, is_active, {}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {}",
            AUDIT_COLUMNS,
            Self::COLUMNS
        );
        let saved = sqlx::query_as::<_, Self>(&sql)
            .bind(id)
            .bind(&row.email)
            .bind(&row.user_name)
            .bind(&row.password_hash)
            .bind(&row.first_name)
            .bind(&row.last_name)
            .bind(row.last_login_at)
            .bind(row.is_active)
            .bind(row.audit.created_at)
            .bind(row.audit.updated_at)
            .bind(&row.audit.created_by)
            .bind(&row.audit.updated_by)
            .bind(row.audit.is_deleted)
            .bind(row.audit.deleted_at)
            .bind(&row.audit.deleted_by)
            .fetch_one(conn)
            .await?;
        Ok(saved)
    }

    async fn update_row(conn: &mut PgConnection, row: &Self) -> Result<Option<Self>> {
        let sql = format!(
            "UPDATE users SET email = $2, user_name = $3, password_hash = $4, first_name = $5, \
             last_name = $6, last_login_at = $7, is_active = $8, updated_at = $9, \
             updated_by = $10, is_deleted = $11, deleted_at = $12, deleted_by = $13 \
             WHERE id = $1 RETURNING {}",
            Self::COLUMNS
        );
        let saved = sqlx::query_as::<_, Self>(&sql)
            .bind(row.id)
            .bind(&row.email)
            .bind(&row.user_name)
            .bind(&row.password_hash)
            .bind(&row.first_name)
            .bind(&row.last_name)
            .bind(row.last_login_at)
            .bind(row.is_active)
            .bind(row.audit.updated_at)
            .bind(&row.audit.updated_by)
            .bind(row.audit.is_deleted)
            .bind(row.audit.deleted_at)
            .bind(&row.audit.deleted_by)
            .fetch_optional(conn)
            .await?;
        Ok(saved)
    }
}
