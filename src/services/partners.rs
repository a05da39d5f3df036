use crate::{
    entities::{partner, partner::PartnerKind, Partner, PartnerModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Service for customers and suppliers
#[derive(Clone)]
pub struct PartnerService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PartnerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_partner(
        &self,
        input: CreatePartnerInput,
    ) -> Result<PartnerModel, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Partner name cannot be blank".to_string(),
            ));
        }

        let partner_id = Uuid::new_v4();
        let partner = partner::ActiveModel {
            id: Set(partner_id),
            name: Set(input.name.trim().to_string()),
            kind: Set(input.kind),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            deleted: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let partner = partner.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PartnerCreated(partner_id))
            .await;

        info!("Created {} partner: {}", partner.kind, partner_id);
        Ok(partner)
    }

    #[instrument(skip(self))]
    pub async fn update_partner(
        &self,
        partner_id: Uuid,
        input: UpdatePartnerInput,
    ) -> Result<PartnerModel, ServiceError> {
        let partner = self.get_partner(partner_id).await?;
        let mut active: partner::ActiveModel = partner.into();

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Partner name cannot be blank".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        active.updated_at = Set(Some(Utc::now()));

        let partner = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PartnerUpdated(partner_id))
            .await;

        Ok(partner)
    }

    /// Get a live partner by ID
    #[instrument(skip(self))]
    pub async fn get_partner(&self, partner_id: Uuid) -> Result<PartnerModel, ServiceError> {
        Partner::find_by_id(partner_id)
            .filter(partner::Column::Deleted.eq(false))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Partner {} not found", partner_id)))
    }

    /// Get a live partner and fail unless it has the expected kind
    pub async fn get_partner_of_kind<C: ConnectionTrait>(
        conn: &C,
        partner_id: Uuid,
        kind: PartnerKind,
    ) -> Result<PartnerModel, ServiceError> {
        let partner = Partner::find_by_id(partner_id)
            .filter(partner::Column::Deleted.eq(false))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Partner {} not found", partner_id)))?;

        if partner.kind != kind {
            return Err(ServiceError::ValidationError(format!(
                "Partner {} is a {}, expected a {}",
                partner_id, partner.kind, kind
            )));
        }

        Ok(partner)
    }

    /// Search live partners, optionally by kind and name substring
    #[instrument(skip(self))]
    pub async fn search_partners(
        &self,
        query: PartnerSearchQuery,
    ) -> Result<PartnerSearchResult, ServiceError> {
        let mut db_query = Partner::find().filter(partner::Column::Deleted.eq(false));

        if let Some(kind) = query.kind {
            db_query = db_query.filter(partner::Column::Kind.eq(kind));
        }

        if let Some(search) = &query.search {
            db_query = db_query.filter(partner::Column::Name.contains(search));
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let partners = db_query
            .order_by_asc(partner::Column::Name)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok(PartnerSearchResult { partners, total })
    }

    /// Soft-delete a partner; transaction history keeps pointing at the row
    #[instrument(skip(self))]
    pub async fn archive_partner(&self, partner_id: Uuid) -> Result<(), ServiceError> {
        let partner = self.get_partner(partner_id).await?;

        let mut active: partner::ActiveModel = partner.into();
        active.deleted = Set(true);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PartnerArchived(partner_id))
            .await;

        info!("Archived partner {}", partner_id);
        Ok(())
    }
}

/// Input for creating a partner
#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePartnerInput {
    pub name: String,
    pub kind: PartnerKind,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for updating a partner. The kind is fixed at creation; a customer
/// never silently becomes a supplier under existing transactions.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdatePartnerInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartnerSearchQuery {
    pub search: Option<String>,
    pub kind: Option<PartnerKind>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PartnerSearchResult {
    pub partners: Vec<PartnerModel>,
    pub total: u64,
}
