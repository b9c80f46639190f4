//! Product catalogue.

use kitty_auth::{ActorCredentials, ActorVerifier};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::MAX_AMOUNT;
use kitty_core::models::audit::{AuditAction, EntityType};
use kitty_core::models::member::RoleRequirement;
use kitty_core::models::product::{CreateProduct, Product, UpdateProduct};
use kitty_core::repository::{MemberRepository, PaginatedResult, Pagination, ProductRepository};
use tracing::debug;
use uuid::Uuid;

use crate::audit;

pub struct ProductService<M: MemberRepository, P: ProductRepository> {
    verifier: ActorVerifier<M>,
    products: P,
}

impl<M: MemberRepository, P: ProductRepository> ProductService<M, P> {
    pub fn new(verifier: ActorVerifier<M>, products: P) -> Self {
        Self { verifier, products }
    }

    pub async fn create_product(
        &self,
        credentials: &ActorCredentials,
        input: CreateProduct,
    ) -> KittyResult<Product> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Privileged))
            .await?;

        let name = normalize_name(&input.name)?;
        check_price(input.price)?;
        self.ensure_name_free(&name).await?;

        let id = Uuid::new_v4();
        let entry = audit::entry(
            actor.id,
            AuditAction::Create,
            EntityType::Product,
            id,
            serde_json::json!({ "name": name, "price": input.price }),
        );
        let product = self
            .products
            .create(
                id,
                CreateProduct {
                    name,
                    price: input.price,
                },
                entry,
            )
            .await?;
        debug!(actor_id = %actor.id, product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        credentials: &ActorCredentials,
        id: Uuid,
        input: UpdateProduct,
    ) -> KittyResult<Product> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::Privileged))
            .await?;

        if input.name.is_none() && input.price.is_none() && input.is_active.is_none() {
            return Err(KittyError::Validation {
                message: "no changes given".into(),
            });
        }
        if let Some(price) = input.price {
            check_price(price)?;
        }
        let name = match &input.name {
            Some(name) => Some(normalize_name(name)?),
            None => None,
        };

        let current = self.products.get_by_id(id).await?;
        if let Some(name) = &name {
            if *name != current.name {
                self.ensure_name_free(name).await?;
            }
        }

        let entry = audit::entry(
            actor.id,
            AuditAction::Update,
            EntityType::Product,
            id,
            serde_json::json!({
                "name": name,
                "price": input.price,
                "is_active": input.is_active,
                "previous_price": current.price,
            }),
        );
        let product = self
            .products
            .update(
                id,
                UpdateProduct {
                    name,
                    price: input.price,
                    is_active: input.is_active,
                },
                entry,
            )
            .await?;
        debug!(actor_id = %actor.id, product_id = %id, "product updated");
        Ok(product)
    }

    pub async fn get(&self, id: Uuid) -> KittyResult<Product> {
        self.products.get_by_id(id).await
    }

    pub async fn list(
        &self,
        active_only: bool,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<Product>> {
        self.products.list(active_only, pagination).await
    }

    async fn ensure_name_free(&self, name: &str) -> KittyResult<()> {
        match self.products.get_by_name(name).await {
            Ok(_) => Err(KittyError::AlreadyExists {
                entity: "product".into(),
            }),
            Err(KittyError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn normalize_name(name: &str) -> KittyResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(KittyError::Validation {
            message: "product name must not be empty".into(),
        });
    }
    Ok(trimmed.to_string())
}

fn check_price(price: i64) -> KittyResult<()> {
    if !(0..=MAX_AMOUNT).contains(&price) {
        return Err(KittyError::InvalidAmount { amount: price });
    }
    Ok(())
}
