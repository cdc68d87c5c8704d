use chrono::{DateTime, Utc};
use contracts::domain::a003_account::aggregate::AccountId;
use contracts::domain::a004_contact::aggregate::ContactId;
use contracts::domain::a005_lead::aggregate::LeadId;
use contracts::domain::a007_deal::aggregate::DealId;
use contracts::domain::a008_visit_report::aggregate::{
    VisitReport, VisitReportId, VisitReportListQuery, VisitStatus,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata, GeoLocation};
use contracts::shared::api::{Page, PageRequest};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, PaginatorTrait, QueryOrder, Select, Set};
use uuid::Uuid;

use crate::shared::data::convert;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a008_visit_report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub account_id: Option<String>,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub deal_id: Option<String>,
    pub sales_rep_id: String,
    pub visit_date: Date,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub check_in_time: Option<DateTimeUtc>,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_in_address: Option<String>,
    pub check_out_time: Option<DateTimeUtc>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_address: Option<String>,
    /// JSON-массив URL фотографий в порядке загрузки
    pub photos: String,
    pub status: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTimeUtc>,
    pub rejection_reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn location(lat: Option<f64>, lng: Option<f64>, address: Option<String>) -> Option<GeoLocation> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(GeoLocation {
            latitude,
            longitude,
            address,
        }),
        _ => None,
    }
}

impl TryFrom<Model> for VisitReport {
    type Error = DbErr;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let photos: Vec<String> = serde_json::from_str(&m.photos)
            .map_err(|e| DbErr::Type(format!("photos: {}", e)))?;
        let metadata = EntityMetadata {
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
            version: m.version,
        };
        Ok(VisitReport {
            base: BaseAggregate::with_metadata(
                VisitReportId::new(convert::uuid("id", &m.id)?),
                m.code,
                metadata,
            ),
            account_id: convert::opt_uuid("account_id", m.account_id.as_deref())?.map(AccountId::new),
            contact_id: convert::opt_uuid("contact_id", m.contact_id.as_deref())?.map(ContactId::new),
            lead_id: convert::opt_uuid("lead_id", m.lead_id.as_deref())?.map(LeadId::new),
            deal_id: convert::opt_uuid("deal_id", m.deal_id.as_deref())?.map(DealId::new),
            sales_rep_id: convert::uuid("sales_rep_id", &m.sales_rep_id)?,
            visit_date: m.visit_date,
            purpose: m.purpose,
            notes: m.notes,
            check_in_time: m.check_in_time,
            check_in_location: location(m.check_in_latitude, m.check_in_longitude, m.check_in_address),
            check_out_time: m.check_out_time,
            check_out_location: location(
                m.check_out_latitude,
                m.check_out_longitude,
                m.check_out_address,
            ),
            photos,
            status: convert::enumeration("status", &m.status, VisitStatus::from_str)?,
            approved_by: convert::opt_uuid("approved_by", m.approved_by.as_deref())?,
            approved_at: m.approved_at,
            rejection_reason: m.rejection_reason,
            created_by: convert::opt_uuid("created_by", m.created_by.as_deref())?,
        })
    }
}

fn to_active(report: &VisitReport) -> Result<ActiveModel, DbErr> {
    let meta = &report.base.metadata;
    let photos = serde_json::to_string(&report.photos)
        .map_err(|e| DbErr::Custom(format!("photos: {}", e)))?;
    let check_in = report.check_in_location.as_ref();
    let check_out = report.check_out_location.as_ref();
    Ok(ActiveModel {
        id: Set(report.base.id.to_string()),
        code: Set(report.base.code.clone()),
        account_id: Set(report.account_id.map(|v| v.to_string())),
        contact_id: Set(report.contact_id.map(|v| v.to_string())),
        lead_id: Set(report.lead_id.map(|v| v.to_string())),
        deal_id: Set(report.deal_id.map(|v| v.to_string())),
        sales_rep_id: Set(report.sales_rep_id.to_string()),
        visit_date: Set(report.visit_date),
        purpose: Set(report.purpose.clone()),
        notes: Set(report.notes.clone()),
        check_in_time: Set(report.check_in_time),
        check_in_latitude: Set(check_in.map(|l| l.latitude)),
        check_in_longitude: Set(check_in.map(|l| l.longitude)),
        check_in_address: Set(check_in.and_then(|l| l.address.clone())),
        check_out_time: Set(report.check_out_time),
        check_out_latitude: Set(check_out.map(|l| l.latitude)),
        check_out_longitude: Set(check_out.map(|l| l.longitude)),
        check_out_address: Set(check_out.and_then(|l| l.address.clone())),
        photos: Set(photos),
        status: Set(report.status.as_str().to_string()),
        approved_by: Set(report.approved_by.map(|v| v.to_string())),
        approved_at: Set(report.approved_at),
        rejection_reason: Set(report.rejection_reason.clone()),
        created_by: Set(report.created_by.map(|v| v.to_string())),
        created_at: Set(meta.created_at),
        updated_at: Set(meta.updated_at),
        deleted_at: Set(meta.deleted_at),
        version: Set(meta.version),
    })
}

fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

fn editable() -> [&'static str; 2] {
    [VisitStatus::Draft.as_str(), VisitStatus::Submitted.as_str()]
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: VisitReportId,
) -> Result<Option<VisitReport>, DbErr> {
    live()
        .filter(Column::Id.eq(id.to_string()))
        .one(conn)
        .await?
        .map(VisitReport::try_from)
        .transpose()
}

/// Сначала самые свежие визиты
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &VisitReportListQuery,
    page: PageRequest,
) -> Result<Page<VisitReport>, DbErr> {
    let mut select = live();
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(rep) = query.sales_rep_id {
        select = select.filter(Column::SalesRepId.eq(rep.to_string()));
    }
    if let Some(account_id) = query.account_id {
        select = select.filter(Column::AccountId.eq(account_id.to_string()));
    }
    if let Some(lead_id) = query.lead_id {
        select = select.filter(Column::LeadId.eq(lead_id.to_string()));
    }
    if let Some(deal_id) = query.deal_id {
        select = select.filter(Column::DealId.eq(deal_id.to_string()));
    }
    if let Some(from) = query.date_from {
        select = select.filter(Column::VisitDate.gte(from));
    }
    if let Some(to) = query.date_to {
        select = select.filter(Column::VisitDate.lte(to));
    }
    let paginator = select
        .order_by_desc(Column::VisitDate)
        .order_by_desc(Column::CreatedAt)
        .paginate(conn, page.per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page.index())
        .await?
        .into_iter()
        .map(VisitReport::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { items, total })
}

pub async fn insert<C: ConnectionTrait>(conn: &C, report: &VisitReport) -> Result<(), DbErr> {
    Entity::insert(to_active(report)?).exec(conn).await?;
    Ok(())
}

/// Записать редактируемые поля черновика или отправленного отчёта, если
/// версия в базе всё ещё `expected_version`
pub async fn save<C: ConnectionTrait>(
    conn: &C,
    report: &VisitReport,
    expected_version: i32,
) -> Result<bool, DbErr> {
    let mut active = to_active(report)?;
    active.photos = ActiveValue::NotSet;
    active.created_at = ActiveValue::NotSet;
    let result = Entity::update_many()
        .set(active)
        .filter(Column::Id.eq(report.base.id.to_string()))
        .filter(Column::Version.eq(expected_version))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Отметить check-in отчёта без check-in. Черновик становится отправленным.
pub async fn record_check_in<C: ConnectionTrait>(
    conn: &C,
    id: VisitReportId,
    at: DateTime<Utc>,
    location: &GeoLocation,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(Column::CheckInTime, Expr::value(at))
        .col_expr(Column::CheckInLatitude, Expr::value(location.latitude))
        .col_expr(Column::CheckInLongitude, Expr::value(location.longitude))
        .col_expr(Column::CheckInAddress, Expr::value(location.address.clone()))
        .col_expr(Column::Status, Expr::value(VisitStatus::Submitted.as_str()))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(Column::CheckInTime.is_null())
        .filter(Column::Status.is_in(editable()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Отметить check-out после check-in. Черновик становится отправленным.
pub async fn record_check_out<C: ConnectionTrait>(
    conn: &C,
    id: VisitReportId,
    at: DateTime<Utc>,
    location: &GeoLocation,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(Column::CheckOutTime, Expr::value(at))
        .col_expr(Column::CheckOutLatitude, Expr::value(location.latitude))
        .col_expr(Column::CheckOutLongitude, Expr::value(location.longitude))
        .col_expr(Column::CheckOutAddress, Expr::value(location.address.clone()))
        .col_expr(Column::Status, Expr::value(VisitStatus::Submitted.as_str()))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(Column::CheckInTime.is_not_null())
        .filter(Column::CheckInTime.lte(at))
        .filter(Column::CheckOutTime.is_null())
        .filter(Column::Status.is_in(editable()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Утвердить или отклонить отправленный отчёт. Под фильтр `status = submitted`
/// попадает только один из конкурирующих проверяющих.
pub async fn record_review<C: ConnectionTrait>(
    conn: &C,
    id: VisitReportId,
    outcome: VisitStatus,
    reviewer: Uuid,
    at: DateTime<Utc>,
    rejection_reason: Option<String>,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(outcome.as_str()))
        .col_expr(Column::ApprovedBy, Expr::value(reviewer.to_string()))
        .col_expr(Column::ApprovedAt, Expr::value(at))
        .col_expr(Column::RejectionReason, Expr::value(rejection_reason))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(Column::Status.eq(VisitStatus::Submitted.as_str()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Добавить URL фотографии в конец списка фото отчёта
pub async fn append_photo<C: ConnectionTrait>(
    conn: &C,
    id: VisitReportId,
    url: &str,
    at: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = Entity::update_many()
        .col_expr(
            Column::Photos,
            Expr::cust_with_values("json_insert(photos, '$[#]', ?)", [url.to_string()]),
        )
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Перепривязать отчёты о визитах конвертированного лида к его сделке.
///
/// `lead_id` остаётся как источник; `account_id` заполняется только там, где пусто.
pub async fn relink_lead<C: ConnectionTrait>(
    conn: &C,
    lead_id: LeadId,
    deal_id: DealId,
    account_id: AccountId,
) -> Result<u64, DbErr> {
    let relinked = Entity::update_many()
        .col_expr(Column::DealId, Expr::value(deal_id.to_string()))
        .filter(Column::LeadId.eq(lead_id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .exec(conn)
        .await?
        .rows_affected;
    Entity::update_many()
        .col_expr(Column::AccountId, Expr::value(account_id.to_string()))
        .filter(Column::LeadId.eq(lead_id.to_string()))
        .filter(Column::DeletedAt.is_null())
        .filter(Column::AccountId.is_null())
        .exec(conn)
        .await?;
    Ok(relinked)
}
