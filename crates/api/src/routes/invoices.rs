//! Invoice lifecycle routes.
//!
//! Every mutating route runs exactly one lifecycle operation through
//! `InvoiceCommands`, so each request is a single load, apply and
//! versioned save.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ValidatedJson},
    middleware::AuthUser,
    reminder::ReminderDelivery,
};
use factura_core::invoice::{
    ClientRef, DetailsChanges, Invoice, InvoiceFilter, InvoiceItem, InvoiceStatus,
    ItemChanges, LifecycleOutcome, LineItemCalculator, NewInvoice, NewInvoiceItem,
    OverdueClassifier, Payment, PaymentInput, PaymentMethod, StatusGraph, StatusHistoryEntry,
};
use factura_shared::types::{ClientId, Currency, InvoiceId, InvoiceItemId};
use factura_store::{Committed, Versioned};

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{invoice_id}",
            get(get_invoice).patch(update_details).delete(delete_invoice),
        )
        .route("/invoices/{invoice_id}/items", post(add_item))
        .route(
            "/invoices/{invoice_id}/items/{item_id}",
            patch(update_item).delete(remove_item),
        )
        .route("/invoices/{invoice_id}/change-status", post(change_status))
        .route("/invoices/{invoice_id}/send", post(send_invoice))
        .route("/invoices/{invoice_id}/mark-paid", post(mark_paid))
        .route("/invoices/{invoice_id}/reopen", post(reopen_invoice))
        .route("/invoices/{invoice_id}/payments", post(record_payment))
        .route("/invoices/{invoice_id}/send-reminder", post(send_reminder))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing invoices.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by client.
    pub client_id: Option<Uuid>,
    /// Filter on the overdue predicate.
    pub overdue: Option<bool>,
    /// Only invoices due strictly before this date (YYYY-MM-DD).
    pub due_before: Option<String>,
    /// Invoice number contains (case-insensitive).
    pub number: Option<String>,
}

/// Client reference in a create request.
#[derive(Debug, Deserialize, Validate)]
pub struct ClientRequest {
    /// Client ID in the client registry.
    pub id: Uuid,
    /// Billing name.
    #[validate(length(min = 1, max = 200, message = "client name is required"))]
    pub name: String,
    /// Billing email.
    #[validate(email(message = "client email is invalid"))]
    pub email: Option<String>,
}

/// A line item in a request. Money fields are decimal strings.
#[derive(Debug, Deserialize, Validate)]
pub struct ItemRequest {
    /// Product name.
    #[validate(length(min = 1, max = 200, message = "product name is required"))]
    pub product_name: String,
    /// Product SKU.
    pub product_sku: Option<String>,
    /// Quantity.
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
    /// Unit price excluding tax.
    pub unit_price_ht: String,
    /// Tax rate in percent.
    pub tax_rate: String,
}

/// Request body for creating an invoice.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    /// Invoice number; allocated when omitted.
    #[validate(length(max = 64))]
    pub invoice_number: Option<String>,
    /// Invoice date; today when omitted.
    pub invoice_date: Option<NaiveDate>,
    /// Due date, `YYYY-MM-DD` or RFC 3339.
    pub due_date: Option<String>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Billed client.
    #[validate(nested)]
    pub client: ClientRequest,
    /// Initial line items.
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ItemRequest>,
    /// Terms and conditions.
    pub terms_conditions: Option<String>,
    /// Client-facing notes.
    pub notes: Option<String>,
    /// Internal notes.
    pub internal_notes: Option<String>,
}

/// Request body for updating a draft item. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    /// New product name.
    #[validate(length(min = 1, max = 200, message = "product name is required"))]
    pub product_name: Option<String>,
    /// New SKU; an empty string clears it.
    pub product_sku: Option<String>,
    /// New quantity.
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<u32>,
    /// New unit price.
    pub unit_price_ht: Option<String>,
    /// New tax rate.
    pub tax_rate: Option<String>,
}

/// Request body for updating draft details. Empty strings clear a field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    /// New due date.
    pub due_date: Option<String>,
    /// New terms and conditions.
    pub terms_conditions: Option<String>,
    /// New client-facing notes.
    pub notes: Option<String>,
    /// New internal notes.
    pub internal_notes: Option<String>,
}

/// Request body for a generic status change.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangeStatusRequest {
    /// Target status.
    pub status: String,
    /// Optional comment for the history entry.
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Request body for send, mark-paid and reopen.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentRequest {
    /// Optional comment for the history entry.
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Request body for recording a payment.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    /// Amount as a decimal string.
    pub amount: String,
    /// Date received; today when omitted.
    pub paid_at: Option<NaiveDate>,
    /// Payment method.
    pub method: Option<String>,
    /// Free-text label.
    #[validate(length(max = 200))]
    pub label: Option<String>,
    /// External reference.
    #[validate(length(max = 200))]
    pub reference: Option<String>,
}

/// Client reference in responses.
#[derive(Debug, Serialize)]
pub struct ClientResponse {
    /// Client ID.
    pub id: Uuid,
    /// Billing name.
    pub name: String,
    /// Billing email.
    pub email: Option<String>,
}

/// Line item with its computed totals.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    /// Item ID.
    pub id: Uuid,
    /// Product name snapshot.
    pub product_name: String,
    /// SKU snapshot.
    pub product_sku: Option<String>,
    /// Quantity.
    pub quantity: u32,
    /// Unit price excluding tax.
    pub unit_price_ht: String,
    /// Tax rate in percent.
    pub tax_rate: String,
    /// Line total excluding tax.
    pub line_ht: String,
    /// Line tax.
    pub line_tax: String,
    /// Line total including tax.
    pub line_ttc: String,
}

/// Payment in responses.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Payment ID.
    pub id: Uuid,
    /// Amount.
    pub amount: String,
    /// Date received.
    pub paid_at: String,
    /// Method.
    pub method: &'static str,
    /// Label.
    pub label: Option<String>,
    /// External reference.
    pub reference: Option<String>,
    /// When the payment was recorded.
    pub recorded_at: String,
    /// Who recorded it.
    pub recorded_by: Option<Uuid>,
    /// When the payment was voided by a reopen, null while it counts.
    pub voided_at: Option<String>,
}

/// History entry in responses.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Position in the trail, starting at 1.
    pub sequence: u32,
    /// Previous status, null for the creation entry.
    pub from_status: Option<&'static str>,
    /// New status.
    pub to_status: &'static str,
    /// Comment.
    pub comment: Option<String>,
    /// Acting user, null for system transitions.
    pub actor: Option<Uuid>,
    /// Timestamp.
    pub created_at: String,
}

/// Full invoice with derived amounts.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    /// Invoice ID.
    pub id: Uuid,
    /// Invoice number.
    pub invoice_number: String,
    /// Status.
    pub status: &'static str,
    /// Human-readable status.
    pub status_label: &'static str,
    /// Statuses reachable through change-status.
    pub allowed_transitions: Vec<&'static str>,
    /// Currency code.
    pub currency: &'static str,
    /// Invoice date.
    pub invoice_date: String,
    /// Due date.
    pub due_date: Option<String>,
    /// Billed client.
    pub client: ClientResponse,
    /// Line items.
    pub items: Vec<ItemResponse>,
    /// Sum of line HT.
    pub subtotal_ht: String,
    /// Sum of line tax.
    pub total_tax: String,
    /// Total including tax.
    pub total_ttc: String,
    /// Sum of payments.
    pub paid_amount: String,
    /// Outstanding balance.
    pub remaining_amount: String,
    /// Whether the invoice is overdue today.
    pub is_overdue: bool,
    /// Whole days past the due date.
    pub days_overdue: i64,
    /// Terms and conditions.
    pub terms_conditions: Option<String>,
    /// Client-facing notes.
    pub notes: Option<String>,
    /// Internal notes.
    pub internal_notes: Option<String>,
    /// Payments in recording order.
    pub payments: Vec<PaymentResponse>,
    /// Status history in order.
    pub history: Vec<HistoryResponse>,
    /// Stored version.
    pub version: u64,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

/// Invoice summary for listings.
#[derive(Debug, Serialize)]
pub struct InvoiceListItem {
    /// Invoice ID.
    pub id: Uuid,
    /// Invoice number.
    pub invoice_number: String,
    /// Status.
    pub status: &'static str,
    /// Client name.
    pub client_name: String,
    /// Currency code.
    pub currency: &'static str,
    /// Invoice date.
    pub invoice_date: String,
    /// Due date.
    pub due_date: Option<String>,
    /// Total including tax.
    pub total_ttc: String,
    /// Outstanding balance.
    pub remaining_amount: String,
    /// Whether the invoice is overdue today.
    pub is_overdue: bool,
    /// Stored version.
    pub version: u64,
}

/// Response for lifecycle operations.
#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    /// Status before the operation.
    pub previous_status: &'static str,
    /// Status after the operation.
    pub status: &'static str,
    /// History entries appended by the operation.
    pub history: Vec<HistoryResponse>,
    /// Payment recorded by the operation.
    pub payment: Option<PaymentResponse>,
    /// Set when the invoice is paid but its ledger still shows a balance.
    pub unreconciled_balance: Option<String>,
    /// The invoice after the operation.
    pub invoice: InvoiceResponse,
}

/// Response for send-reminder.
#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    /// Invoice ID.
    pub invoice_id: Uuid,
    /// Invoice number.
    pub invoice_number: String,
    /// Outstanding balance.
    pub remaining: String,
    /// Currency code.
    pub currency: &'static str,
    /// Due date.
    pub due_date: Option<String>,
    /// Whole days past the due date.
    pub days_overdue: i64,
    /// How the reminder was delivered.
    pub delivery: ReminderDelivery,
}

fn money(amount: Decimal, currency: Currency) -> String {
    let mut value = currency.round(amount);
    value.rescale(currency.minor_units());
    value.to_string()
}

fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

impl ItemResponse {
    fn with_currency(item: &InvoiceItem, currency: Currency) -> Self {
        let totals = LineItemCalculator::line_totals(item, currency);
        Self {
            id: item.id.into_inner(),
            product_name: item.product_name_snapshot.clone(),
            product_sku: item.product_sku_snapshot.clone(),
            quantity: item.quantity,
            unit_price_ht: money(item.unit_price_ht_snapshot, currency),
            tax_rate: item.tax_rate_snapshot.normalize().to_string(),
            line_ht: money(totals.line_ht, currency),
            line_tax: money(totals.line_tax, currency),
            line_ttc: money(totals.line_ttc, currency),
        }
    }
}

impl PaymentResponse {
    fn with_currency(payment: &Payment, currency: Currency) -> Self {
        Self {
            id: payment.id.into_inner(),
            amount: money(payment.amount, currency),
            paid_at: date(payment.paid_at),
            method: payment.method.as_str(),
            label: payment.label.clone(),
            reference: payment.reference.clone(),
            recorded_at: timestamp(payment.recorded_at),
            recorded_by: payment.recorded_by.map(|u| u.into_inner()),
            voided_at: payment.voided_at.map(timestamp),
        }
    }
}

impl From<&StatusHistoryEntry> for HistoryResponse {
    fn from(entry: &StatusHistoryEntry) -> Self {
        Self {
            sequence: entry.sequence,
            from_status: entry.from_status.map(|s| s.as_str()),
            to_status: entry.to_status.as_str(),
            comment: entry.comment.clone(),
            actor: entry.actor.map(|u| u.into_inner()),
            created_at: timestamp(entry.created_at),
        }
    }
}

impl InvoiceResponse {
    fn new(invoice: &Invoice, version: u64, today: NaiveDate) -> Self {
        let currency = invoice.currency();
        let totals = invoice.totals();
        let status = invoice.status();
        let is_overdue = invoice.is_overdue(today);
        Self {
            id: invoice.id().into_inner(),
            invoice_number: invoice.invoice_number().to_string(),
            status: status.as_str(),
            status_label: status.label(),
            allowed_transitions: StatusGraph::allowed_targets(status)
                .iter()
                .map(InvoiceStatus::as_str)
                .collect(),
            currency: invoice.currency().code(),
            invoice_date: date(invoice.invoice_date()),
            due_date: invoice.due_date().map(date),
            client: ClientResponse {
                id: invoice.client().id.into_inner(),
                name: invoice.client().name.clone(),
                email: invoice.client().email.clone(),
            },
            items: invoice
                .items()
                .iter()
                .map(|item| ItemResponse::with_currency(item, currency))
                .collect(),
            subtotal_ht: money(totals.subtotal_ht, currency),
            total_tax: money(totals.total_tax, currency),
            total_ttc: money(totals.total_ttc, currency),
            paid_amount: money(invoice.paid_amount(), currency),
            remaining_amount: money(invoice.remaining_amount(), currency),
            is_overdue,
            days_overdue: if is_overdue {
                OverdueClassifier::days_overdue(invoice.due_date(), today)
            } else {
                0
            },
            terms_conditions: invoice.terms_conditions().map(str::to_string),
            notes: invoice.notes().map(str::to_string),
            internal_notes: invoice.internal_notes().map(str::to_string),
            payments: invoice
                .payments()
                .iter()
                .map(|payment| PaymentResponse::with_currency(payment, currency))
                .collect(),
            history: invoice
                .status_history()
                .iter()
                .map(HistoryResponse::from)
                .collect(),
            version,
            created_at: timestamp(invoice.created_at()),
            updated_at: timestamp(invoice.updated_at()),
        }
    }

    fn from_stored(stored: &Versioned<Invoice>, today: NaiveDate) -> Self {
        Self::new(&stored.value, stored.version, today)
    }

    fn from_committed<T>(committed: &Committed<T>, today: NaiveDate) -> Self {
        Self::new(&committed.invoice, committed.version, today)
    }
}

impl InvoiceListItem {
    fn new(stored: &Versioned<Invoice>, today: NaiveDate) -> Self {
        let invoice = &stored.value;
        Self {
            id: invoice.id().into_inner(),
            invoice_number: invoice.invoice_number().to_string(),
            status: invoice.status().as_str(),
            client_name: invoice.client().name.clone(),
            currency: invoice.currency().code(),
            invoice_date: date(invoice.invoice_date()),
            due_date: invoice.due_date().map(date),
            total_ttc: money(invoice.totals().total_ttc, invoice.currency()),
            remaining_amount: money(invoice.remaining_amount(), invoice.currency()),
            is_overdue: invoice.is_overdue(today),
            version: stored.version,
        }
    }
}

impl LifecycleResponse {
    fn new(committed: Committed<LifecycleOutcome>, today: NaiveDate) -> Self {
        let invoice = InvoiceResponse::from_committed(&committed, today);
        let currency = committed.invoice.currency();
        let outcome = committed.result;
        Self {
            previous_status: outcome.previous_status.as_str(),
            status: outcome.status.as_str(),
            history: outcome.history.iter().map(HistoryResponse::from).collect(),
            payment: outcome
                .payment
                .as_ref()
                .map(|payment| PaymentResponse::with_currency(payment, currency)),
            unreconciled_balance: outcome
                .unreconciled_balance
                .map(|balance| money(balance, currency)),
            invoice,
        }
    }
}

// ============================================================================
// Request parsing
// ============================================================================

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("{field} must be a decimal number")))
}

fn parse_status(raw: &str) -> Result<InvoiceStatus, ApiError> {
    InvoiceStatus::parse(raw).ok_or_else(|| ApiError::validation(format!("unknown status: {raw}")))
}

fn parse_due(raw: &str, timezone: Tz) -> Result<Option<NaiveDate>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    OverdueClassifier::parse_due_date(raw, timezone)
        .map(Some)
        .ok_or_else(|| ApiError::validation(format!("invalid due date: {raw}")))
}

/// `None` leaves a field alone, an empty string clears it.
fn text_change(raw: Option<String>) -> Option<Option<String>> {
    raw.map(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

impl ItemRequest {
    fn into_new_item(self) -> Result<NewInvoiceItem, ApiError> {
        Ok(NewInvoiceItem {
            unit_price_ht: parse_decimal("unit_price_ht", &self.unit_price_ht)?,
            tax_rate: parse_decimal("tax_rate", &self.tax_rate)?,
            product_name: self.product_name,
            product_sku: self.product_sku.filter(|sku| !sku.trim().is_empty()),
            quantity: self.quantity,
        })
    }
}

impl CreateInvoiceRequest {
    fn into_new_invoice(self, timezone: Tz, today: NaiveDate) -> Result<NewInvoice, ApiError> {
        let currency = Currency::from_str(&self.currency).map_err(ApiError::validation)?;
        let due_date = match self.due_date.as_deref() {
            Some(raw) => parse_due(raw, timezone)?,
            None => None,
        };
        let items = self
            .items
            .into_iter()
            .map(ItemRequest::into_new_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewInvoice {
            invoice_number: self.invoice_number.unwrap_or_default(),
            invoice_date: self.invoice_date.unwrap_or(today),
            due_date,
            currency,
            client: ClientRef {
                id: ClientId::from_uuid(self.client.id),
                name: self.client.name,
                email: self.client.email,
            },
            items,
            terms_conditions: self.terms_conditions,
            notes: self.notes,
            internal_notes: self.internal_notes,
        })
    }
}

impl UpdateItemRequest {
    fn into_changes(self) -> Result<ItemChanges, ApiError> {
        Ok(ItemChanges {
            unit_price_ht: self
                .unit_price_ht
                .as_deref()
                .map(|raw| parse_decimal("unit_price_ht", raw))
                .transpose()?,
            tax_rate: self
                .tax_rate
                .as_deref()
                .map(|raw| parse_decimal("tax_rate", raw))
                .transpose()?,
            product_name: self.product_name,
            product_sku: text_change(self.product_sku),
            quantity: self.quantity,
        })
    }
}

impl UpdateDetailsRequest {
    fn into_changes(self, timezone: Tz) -> Result<DetailsChanges, ApiError> {
        Ok(DetailsChanges {
            due_date: self
                .due_date
                .as_deref()
                .map(|raw| parse_due(raw, timezone))
                .transpose()?,
            terms_conditions: text_change(self.terms_conditions),
            notes: text_change(self.notes),
            internal_notes: text_change(self.internal_notes),
        })
    }
}

impl RecordPaymentRequest {
    fn into_input(self, today: NaiveDate) -> Result<PaymentInput, ApiError> {
        let method = match self.method.as_deref() {
            Some(raw) => PaymentMethod::parse(raw)
                .ok_or_else(|| ApiError::validation(format!("unknown payment method: {raw}")))?,
            None => PaymentMethod::Unspecified,
        };
        Ok(PaymentInput {
            amount: parse_decimal("amount", &self.amount)?,
            paid_at: self.paid_at.unwrap_or(today),
            method,
            label: self.label,
            reference: self.reference,
        })
    }
}

impl ListInvoicesQuery {
    fn into_filters(self) -> Result<Vec<InvoiceFilter>, ApiError> {
        let mut filters = Vec::new();
        if let Some(raw) = self.status.as_deref() {
            filters.push(InvoiceFilter::Status(parse_status(raw)?));
        }
        if let Some(client_id) = self.client_id {
            filters.push(InvoiceFilter::Client(ClientId::from_uuid(client_id)));
        }
        if let Some(overdue) = self.overdue {
            filters.push(InvoiceFilter::Overdue(overdue));
        }
        if let Some(raw) = self.due_before.as_deref() {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| ApiError::validation(format!("invalid due_before date: {raw}")))?;
            filters.push(InvoiceFilter::DueBefore(date));
        }
        if let Some(number) = self.number.filter(|n| !n.trim().is_empty()) {
            filters.push(InvoiceFilter::NumberContains(number.trim().to_string()));
        }
        Ok(filters)
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/invoices` - List invoices matching the query filters.
async fn list_invoices(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let today = state.commands.service().today(now);
    let filters = query.into_filters()?;

    let invoices = state.commands.list(&filters, now).await?;
    let items: Vec<_> = invoices
        .iter()
        .map(|stored| InvoiceListItem::new(stored, today))
        .collect();
    Ok(Json(items))
}

/// POST `/invoices` - Create a draft invoice.
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let service = state.commands.service();
    let today = service.today(now);
    let input = request.into_new_invoice(service.policy().timezone, today)?;

    let stored = state.commands.create(input, &auth.actor(), now).await?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse::from_stored(&stored, today)),
    ))
}

/// GET `/invoices/{invoice_id}` - Invoice with totals, payments and history.
async fn get_invoice(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let today = state.commands.service().today(Utc::now());
    let stored = state.commands.get(InvoiceId::from_uuid(invoice_id)).await?;
    Ok(Json(InvoiceResponse::from_stored(&stored, today)))
}

/// PATCH `/invoices/{invoice_id}` - Update draft details.
async fn update_details(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateDetailsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let service = state.commands.service();
    let changes = request.into_changes(service.policy().timezone)?;

    let committed = state
        .commands
        .update_details(InvoiceId::from_uuid(invoice_id), changes, &auth.actor(), now)
        .await?;
    Ok(Json(InvoiceResponse::from_committed(
        &committed,
        service.today(now),
    )))
}

/// DELETE `/invoices/{invoice_id}` - Delete a draft without payments.
async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .commands
        .delete(InvoiceId::from_uuid(invoice_id), &auth.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/invoices/{invoice_id}/items` - Add a line item to a draft.
async fn add_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let item = request.into_new_item()?;

    let committed = state
        .commands
        .add_item(InvoiceId::from_uuid(invoice_id), item, &auth.actor(), now)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse::from_committed(
            &committed,
            state.commands.service().today(now),
        )),
    ))
}

/// PATCH `/invoices/{invoice_id}/items/{item_id}` - Update a draft line item.
async fn update_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let changes = request.into_changes()?;

    let committed = state
        .commands
        .update_item(
            InvoiceId::from_uuid(invoice_id),
            InvoiceItemId::from_uuid(item_id),
            changes,
            &auth.actor(),
            now,
        )
        .await?;
    Ok(Json(InvoiceResponse::from_committed(
        &committed,
        state.commands.service().today(now),
    )))
}

/// DELETE `/invoices/{invoice_id}/items/{item_id}` - Remove a draft line item.
async fn remove_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let committed = state
        .commands
        .remove_item(
            InvoiceId::from_uuid(invoice_id),
            InvoiceItemId::from_uuid(item_id),
            &auth.actor(),
            now,
        )
        .await?;
    Ok(Json(InvoiceResponse::from_committed(
        &committed,
        state.commands.service().today(now),
    )))
}

/// POST `/invoices/{invoice_id}/change-status` - Generic status change.
async fn change_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ChangeStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let target = parse_status(&request.status)?;

    let committed = state
        .commands
        .change_status(
            InvoiceId::from_uuid(invoice_id),
            target,
            request.comment,
            &auth.actor(),
            now,
        )
        .await?;
    Ok(Json(LifecycleResponse::new(
        committed,
        state.commands.service().today(now),
    )))
}

/// POST `/invoices/{invoice_id}/send` - Send a draft or re-send a cancelled invoice.
async fn send_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let committed = state
        .commands
        .send(
            InvoiceId::from_uuid(invoice_id),
            request.comment,
            &auth.actor(),
            now,
        )
        .await?;
    Ok(Json(LifecycleResponse::new(
        committed,
        state.commands.service().today(now),
    )))
}

/// POST `/invoices/{invoice_id}/mark-paid` - Force an invoice to paid.
async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let committed = state
        .commands
        .mark_paid(
            InvoiceId::from_uuid(invoice_id),
            request.comment,
            &auth.actor(),
            now,
        )
        .await?;
    Ok(Json(LifecycleResponse::new(
        committed,
        state.commands.service().today(now),
    )))
}

/// POST `/invoices/{invoice_id}/reopen` - Reopen a refunded invoice as a draft.
async fn reopen_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let committed = state
        .commands
        .reopen(
            InvoiceId::from_uuid(invoice_id),
            request.comment,
            &auth.actor(),
            now,
        )
        .await?;
    Ok(Json(LifecycleResponse::new(
        committed,
        state.commands.service().today(now),
    )))
}

/// POST `/invoices/{invoice_id}/payments` - Record a payment.
async fn record_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RecordPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let today = state.commands.service().today(now);
    let input = request.into_input(today)?;

    let committed = state
        .commands
        .record_payment(InvoiceId::from_uuid(invoice_id), input, &auth.actor(), now)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(LifecycleResponse::new(committed, today)),
    ))
}

/// POST `/invoices/{invoice_id}/send-reminder` - Remind the client of an overdue invoice.
async fn send_reminder(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let reminder = state
        .commands
        .send_reminder(InvoiceId::from_uuid(invoice_id), &auth.actor(), now)
        .await?;
    let delivery = state.reminders.dispatch(&reminder).await?;

    Ok(Json(ReminderResponse {
        invoice_id: reminder.invoice_id.into_inner(),
        invoice_number: reminder.invoice_number,
        remaining: money(reminder.remaining.amount, reminder.remaining.currency),
        currency: reminder.remaining.currency.code(),
        due_date: reminder.due_date.map(date),
        days_overdue: reminder.days_overdue,
        delivery,
    }))
}
