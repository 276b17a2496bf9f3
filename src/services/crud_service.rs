use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use crate::dto::{category_dto::CategoryDto, product_dto::ProductDto, user_dto::UserDto};
use crate::error::{Error, Result};
use crate::models::{Category, Entity, Product, User};
use crate::repositories::{Repository, Table, UnitOfWork};

/// Mapping between a stored entity and the DTO services hand out.
pub trait EntityDto: Sized + Send + Sync {
    type Entity: Table;

    fn key(&self) -> <Self::Entity as Entity>::Key;
    fn to_entity(&self) -> Self::Entity;
    /// Copies client editable fields onto a loaded entity.
    fn apply_to(&self, entity: &mut Self::Entity);
    fn from_entity(entity: &Self::Entity) -> Self;
}

/// Generic create/read/update/delete over one entity/DTO pair. Domain
/// services compose it and add their own rules in front.
pub struct CrudService<D: EntityDto> {
    uow: Arc<UnitOfWork>,
    _dto: PhantomData<fn() -> D>,
}

impl<D: EntityDto> Clone for CrudService<D> {
    fn clone(&self) -> Self {
        Self {
            uow: self.uow.clone(),
            _dto: PhantomData,
        }
    }
}

impl<D: EntityDto> CrudService<D> {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self {
            uow,
            _dto: PhantomData,
        }
    }

    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.uow
    }

    pub fn repository(&self) -> Arc<Repository<D::Entity>> {
        self.uow.repository::<D::Entity>()
    }

    pub async fn get_by_id(&self, id: <D::Entity as Entity>::Key) -> Result<Option<D>> {
        let entity = self.repository().get_by_id(id).await?;
        Ok(entity.as_ref().map(D::from_entity))
    }

    pub async fn get_all(&self) -> Result<Vec<D>> {
        let entities = self.repository().get_all().await?;
        Ok(entities.iter().map(D::from_entity).collect())
    }

    pub async fn create(&self, dto: &D) -> Result<D> {
        let name = <D::Entity as Entity>::NAME;
        let tracked = self.repository().add(dto.to_entity());
        self.uow.save_changes().await.map_err(|err| {
            persistence_error(err, "CREATE_FAILED", format!("Failed to create {}", name))
        })?;
        let created = tracked.get();
        info!(entity = name, id = %created.id(), "Created");
        Ok(D::from_entity(&created))
    }

    pub async fn update(&self, dto: &D) -> Result<D> {
        let name = <D::Entity as Entity>::NAME;
        let key = dto.key();
        let repository = self.repository();
        let mut entity = repository
            .get_by_id(key)
            .await?
            .ok_or_else(|| Error::not_found(name, key))?;
        dto.apply_to(&mut entity);

        let tracked = repository.update(entity);
        self.uow
            .save_changes()
            .await
            .map_err(|err| match err {
                Error::Conflict(_) => Error::business_from(
                    "CONCURRENCY_CONFLICT",
                    format!("Entity {} was modified by another user", name),
                    err,
                ),
                other => persistence_error(other, "UPDATE_FAILED", format!("Failed to update {}", name)),
            })?;
        info!(entity = name, id = %key, "Updated");
        Ok(D::from_entity(&tracked.get()))
    }

    pub async fn delete(&self, id: <D::Entity as Entity>::Key) -> Result<()> {
        let name = <D::Entity as Entity>::NAME;
        let repository = self.repository();
        let entity = repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(name, id))?;
        repository.delete(entity);
        self.uow.save_changes().await.map_err(|err| {
            persistence_error(err, "DELETE_FAILED", format!("Failed to delete {}", name))
        })?;
        info!(entity = name, id = %id, "Soft deleted");
        Ok(())
    }
}

/// Passes domain errors through and wraps everything else under `code`.
pub(crate) fn persistence_error(err: Error, code: &str, message: String) -> Error {
    if err.is_domain() {
        err
    } else {
        Error::business_from(code, message, err)
    }
}

impl EntityDto for CategoryDto {
    type Entity = Category;

    fn key(&self) -> i64 {
        self.id
    }

    fn to_entity(&self) -> Category {
        let mut category = Category::default();
        self.apply_to(&mut category);
        category
    }

    fn apply_to(&self, category: &mut Category) {
        category.name = self.name.trim().to_string();
        category.description = self.description.clone();
        category.display_order = self.display_order;
        category.is_active = self.is_active;
    }

    fn from_entity(category: &Category) -> Self {
        CategoryDto::from(category)
    }
}

impl EntityDto for ProductDto {
    type Entity = Product;

    fn key(&self) -> i64 {
        self.id
    }

    fn to_entity(&self) -> Product {
        let mut product = Product::default();
        self.apply_to(&mut product);
        product
    }

    fn apply_to(&self, product: &mut Product) {
        product.name = self.name.trim().to_string();
        product.description = self.description.clone();
        product.price = self.price;
        product.sale_price = self.sale_price;
        product.stock_quantity = self.stock_quantity;
        product.sku = self
            .sku
            .as_deref()
            .map(str::trim)
            .filter(|sku| !sku.is_empty())
            .map(str::to_string);
        product.is_active = self.is_active;
        product.is_featured = self.is_featured;
        product.category_id = self.category_id;
    }

    fn from_entity(product: &Product) -> Self {
        ProductDto::from(product)
    }
}

impl EntityDto for UserDto {
    type Entity = User;

    fn key(&self) -> uuid::Uuid {
        self.id
    }

    fn to_entity(&self) -> User {
        let mut user = User::default();
        self.apply_to(&mut user);
        user
    }

    fn apply_to(&self, user: &mut User) {
        user.email = self.email.trim().to_string();
        user.user_name = self.user_name.trim().to_string();
        user.first_name = self.first_name.clone();
        user.last_name = self.last_name.clone();
        user.is_active = self.is_active;
    }

    fn from_entity(user: &User) -> Self {
        UserDto::from(user)
    }
}
