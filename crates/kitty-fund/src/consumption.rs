//! Consumption booking.
//!
//! A consumption charges a member for `quantity` units of a product at
//! the product's price at booking time. Consumptions are immutable.

use kitty_auth::{ActorCredentials, ActorVerifier};
use kitty_core::error::{KittyError, KittyResult};
use kitty_core::models::MAX_AMOUNT;
use kitty_core::models::audit::{AuditAction, EntityType};
use kitty_core::models::consumption::{Consumption, ConsumptionFilter, CreateConsumption};
use kitty_core::models::member::RoleRequirement;
use kitty_core::repository::{
    ConsumptionRepository, MemberRepository, PaginatedResult, Pagination, ProductRepository,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit;
use crate::config::FundConfig;

pub struct ConsumptionService<M, P, C>
where
    M: MemberRepository,
    P: ProductRepository,
    C: ConsumptionRepository,
{
    verifier: ActorVerifier<M>,
    members: M,
    products: P,
    consumptions: C,
    config: FundConfig,
}

impl<M, P, C> ConsumptionService<M, P, C>
where
    M: MemberRepository,
    P: ProductRepository,
    C: ConsumptionRepository,
{
    pub fn new(
        verifier: ActorVerifier<M>,
        members: M,
        products: P,
        consumptions: C,
        config: FundConfig,
    ) -> Self {
        Self {
            verifier,
            members,
            products,
            consumptions,
            config,
        }
    }

    /// Book `quantity` units of `product_id` for `member_id`.
    ///
    /// Members book for themselves; treasurers and administrators may
    /// book for any active member.
    pub async fn book(
        &self,
        credentials: &ActorCredentials,
        member_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> KittyResult<Consumption> {
        let actor = self
            .verifier
            .verify_credentials(credentials, Some(RoleRequirement::AnyMember))
            .await?;

        if !actor.is_privileged() && member_id != actor.id {
            warn!(actor_id = %actor.id, target = %member_id, "booking for another member refused");
            return Err(KittyError::ForbiddenTarget);
        }
        if quantity <= 0 {
            return Err(KittyError::Validation {
                message: "quantity must be positive".into(),
            });
        }

        let member = self.members.get_by_id(member_id).await?;
        if !member.is_active {
            return Err(KittyError::ActorInactive);
        }
        let product = self.products.get_by_id(product_id).await?;
        if !product.is_active {
            return Err(KittyError::Validation {
                message: format!("product {} is not available", product.name),
            });
        }
        let amount = product
            .price
            .checked_mul(quantity)
            .filter(|amount| *amount <= MAX_AMOUNT)
            .ok_or(KittyError::InvalidAmount {
                amount: product.price.saturating_mul(quantity),
            })?;

        let id = Uuid::new_v4();
        let entry = audit::entry(
            actor.id,
            AuditAction::Create,
            EntityType::Consumption,
            id,
            serde_json::json!({
                "member_id": member_id.to_string(),
                "product_id": product_id.to_string(),
                "quantity": quantity,
                "unit_price": product.price,
                "amount": amount,
            }),
        );
        let consumption = self
            .consumptions
            .create(
                id,
                CreateConsumption {
                    member_id,
                    product_id,
                    quantity,
                    unit_price: product.price,
                    amount,
                    created_by: actor.id,
                },
                entry,
            )
            .await?;
        debug!(
            consumption_id = %consumption.id,
            member_id = %member_id,
            amount,
            "consumption booked"
        );
        Ok(consumption)
    }

    pub async fn get(&self, id: Uuid) -> KittyResult<Consumption> {
        self.consumptions.get_by_id(id).await
    }

    /// Newest first.
    pub async fn list(
        &self,
        filter: ConsumptionFilter,
        pagination: Pagination,
    ) -> KittyResult<PaginatedResult<Consumption>> {
        self.consumptions.list(filter, pagination).await
    }

    /// The member's latest consumptions, at most the configured limit.
    pub async fn recent_for_member(
        &self,
        member_id: Uuid,
        limit: u64,
    ) -> KittyResult<Vec<Consumption>> {
        let page = self
            .consumptions
            .list(
                ConsumptionFilter {
                    member_id: Some(member_id),
                    product_id: None,
                },
                Pagination {
                    offset: 0,
                    limit: limit.min(self.config.recent_consumption_limit),
                },
            )
            .await?;
        Ok(page.items)
    }
}
