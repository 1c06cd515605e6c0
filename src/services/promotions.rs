use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::promotion::{self, DiscountType, PromotionStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::validate_non_negative,
    PaginatedResponse,
};

/// Outcome of checking a promotion code against a cart subtotal. When the
/// code is rejected the message says why; orders proceed without a
/// promotion rather than failing.
#[derive(Debug, Clone)]
pub struct PromotionEvaluation {
    pub promotion: Option<promotion::Model>,
    pub discount: Decimal,
    pub message: String,
    pub is_valid: bool,
}

impl PromotionEvaluation {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            promotion: None,
            discount: Decimal::ZERO,
            message: message.into(),
            is_valid: false,
        }
    }

    pub fn promotion_id(&self) -> Option<i32> {
        self.promotion.as_ref().map(|p| p.promo_id)
    }
}

/// Discount a promotion grants on a subtotal, rounded to cents and
/// clamped to [0, subtotal] so a total can never go negative.
pub fn calculate_discount(promotion: &promotion::Model, subtotal: Decimal) -> Decimal {
    let raw = match promotion.discount_type {
        DiscountType::Percent => subtotal * promotion.discount_value / Decimal::from(100),
        DiscountType::Fixed => promotion.discount_value,
    };
    raw.round_dp(2).clamp(Decimal::ZERO, subtotal)
}

///// Amount formatted for user-facing messages: thousands separators,
/// trailing zero cents dropped.
fn format_amount(amount: Decimal) -> String {
    let normalized = amount.round_dp(2).normalize();
    let text = normalized.to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

fn assess(
    promotion: Option<promotion::Model>,
    code: &str,
    subtotal: Decimal,
    today: NaiveDate,
    enforce_usage_limit: bool,
) -> PromotionEvaluation {
    let Some(promotion) = promotion else {
        return PromotionEvaluation::rejected("Promotion code does not exist.");
    };

    if today < promotion.start_date || today > promotion.end_date {
        return PromotionEvaluation::rejected("Promotion code has expired.");
    }

    if subtotal < promotion.min_order_amount {
        return PromotionEvaluation::rejected(format!(
            "Minimum order of {} required to apply this code.",
            format_amount(promotion.min_order_amount)
        ));
    }

    if enforce_usage_limit
        && promotion.usage_limit > 0
        && promotion.used_count >= promotion.usage_limit
    {
        return PromotionEvaluation::rejected("Promotion code usage limit reached.");
    }

    let discount = calculate_discount(&promotion, subtotal);
    if discount <= Decimal::ZERO {
        return PromotionEvaluation::rejected(format!(
            "Promotion code {} does not reduce this order.",
            code
        ));
    }

    PromotionEvaluation {
        message: format!("Promotion code {} applied.", code),
        is_valid: true,
        discount,
        promotion: Some(promotion),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePromotionRequest {
    #[validate(length(min = 1, max = 50, message = "Promotion code must be 1-50 characters"))]
    pub promo_code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub min_order_amount: Decimal,
    /// 0 means unlimited.
    #[serde(default)]
    #[validate(range(min = 0, message = "Usage limit cannot be negative"))]
    pub usage_limit: i32,
    pub status: Option<PromotionStatus>,
}

/// Full replacement except for `used_count`, which only the order
/// workflow may move.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePromotionRequest {
    #[validate(length(min = 1, max = 50, message = "Promotion code must be 1-50 characters"))]
    pub promo_code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub min_order_amount: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, message = "Usage limit cannot be negative"))]
    pub usage_limit: i32,
    pub status: Option<PromotionStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromotionFilter {
    /// Substring match on code or description.
    pub search: Option<String>,
    pub status: Option<PromotionStatus>,
    /// Only promotions whose validity window contains this date.
    pub active_on: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    /// Policy switch: when on, codes at their usage limit are rejected at
    /// evaluation time and the usage increment is guarded by the same
    /// condition.
    enforce_usage_limit: bool,
}

impl PromotionService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        enforce_usage_limit: bool,
    ) -> Self {
        Self {
            db,
            event_sender,
            enforce_usage_limit,
        }
    }

    /// Checks a code against a subtotal. Runs on the caller's connection so
    /// the order workflow can evaluate inside its own transaction.
    pub async fn evaluate<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: Option<&str>,
        subtotal: Decimal,
        today: NaiveDate,
    ) -> Result<PromotionEvaluation, ServiceError> {
        let code = code.map(str::trim).unwrap_or_default();
        if code.is_empty() {
            return Ok(PromotionEvaluation::rejected("No promotion code applied."));
        }

        let promotion = promotion::Entity::find()
            .filter(promotion::Column::PromoCode.eq(code))
            .filter(promotion::Column::Status.eq(PromotionStatus::Active))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(assess(
            promotion,
            code,
            subtotal,
            today,
            self.enforce_usage_limit,
        ))
    }

    /// Bumps `used_count` inside the order transaction. Returns false when
    /// the guarded update matched no row (unknown id, or limit reached
    /// under the enforcement policy); the caller then drops the promotion
    /// instead of failing the order.
    pub async fn increment_used_count(
        &self,
        txn: &DatabaseTransaction,
        promo_id: i32,
    ) -> Result<bool, ServiceError> {
        let mut update = promotion::Entity::update_many()
            .col_expr(
                promotion::Column::UsedCount,
                Expr::col(promotion::Column::UsedCount).add(1),
            )
            .filter(promotion::Column::PromoId.eq(promo_id));

        if self.enforce_usage_limit {
            update = update.filter(
                Condition::any()
                    .add(promotion::Column::UsageLimit.eq(0))
                    .add(
                        Expr::col(promotion::Column::UsedCount)
                            .lt(Expr::col(promotion::Column::UsageLimit)),
                    ),
            );
        }

        let result = update.exec(txn).await.map_err(ServiceError::DatabaseError)?;
        Ok(result.rows_affected == 1)
    }

    /// Reversal half of [`increment_used_count`](Self::increment_used_count);
    /// the guard keeps the counter at zero or above.
    pub async fn decrement_used_count(
        &self,
        txn: &DatabaseTransaction,
        promo_id: i32,
    ) -> Result<(), ServiceError> {
        promotion::Entity::update_many()
            .col_expr(
                promotion::Column::UsedCount,
                Expr::col(promotion::Column::UsedCount).sub(1),
            )
            .filter(promotion::Column::PromoId.eq(promo_id))
            .filter(promotion::Column::UsedCount.gt(0))
            .exec(txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, promo_id: i32) -> Result<promotion::Model, ServiceError> {
        promotion::Entity::find_by_id(promo_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Promotion #{} not found", promo_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: PromotionFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<promotion::Model>, ServiceError> {
        let mut query = promotion::Entity::find()
            .order_by_desc(promotion::Column::StartDate)
            .order_by_desc(promotion::Column::PromoId);

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(promotion::Column::PromoCode.like(&pattern))
                    .add(promotion::Column::Description.like(&pattern)),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(promotion::Column::Status.eq(status));
        }
        if let Some(date) = filter.active_on {
            query = query
                .filter(promotion::Column::StartDate.lte(date))
                .filter(promotion::Column::EndDate.gte(date));
        }

        let page = page.max(1);
        let limit = limit.max(1);
        let paginator = query.paginate(&*self.db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    #[instrument(skip(self, request), fields(promo_code = %request.promo_code))]
    pub async fn create(
        &self,
        request: CreatePromotionRequest,
    ) -> Result<promotion::Model, ServiceError> {
        request.validate()?;
        let code = request.promo_code.trim().to_string();
        let today = Utc::now().date_naive();

        validate_discount_value(request.discount_type, request.discount_value)?;
        if request.start_date >= request.end_date {
            return Err(ServiceError::ValidationError(
                "Start date must be before end date".to_string(),
            ));
        }
        if request.start_date < today {
            return Err(ServiceError::ValidationError(
                "Start date cannot be in the past".to_string(),
            ));
        }

        let taken = promotion::Entity::find()
            .filter(promotion::Column::PromoCode.eq(&code))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Promotion code {} already exists",
                code
            )));
        }

        let model = promotion::ActiveModel {
            promo_code: Set(code),
            description: Set(request.description),
            discount_type: Set(request.discount_type),
            discount_value: Set(request.discount_value),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            min_order_amount: Set(request.min_order_amount),
            usage_limit: Set(request.usage_limit),
            used_count: Set(0),
            status: Set(request.status.unwrap_or(PromotionStatus::Active)),
            ..Default::default()
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(promo_id = created.promo_id, "Promotion created");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::PromotionCreated(created.promo_id))
                .await;
        }

        Ok(created)
    }

    /// A started promotion keeps its start date; one that has not started
    /// yet may move it, but not into the past.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        promo_id: i32,
        request: UpdatePromotionRequest,
    ) -> Result<promotion::Model, ServiceError> {
        request.validate()?;
        let code = request.promo_code.trim().to_string();
        let today = Utc::now().date_naive();

        validate_discount_value(request.discount_type, request.discount_value)?;
        if request.start_date >= request.end_date {
            return Err(ServiceError::ValidationError(
                "Start date must be before end date".to_string(),
            ));
        }

        let existing = self.get(promo_id).await?;

        let started = existing.start_date <= today;
        if started && request.start_date != existing.start_date {
            return Err(ServiceError::ValidationError(
                "Start date cannot be changed after the promotion has started".to_string(),
            ));
        }
        if !started && request.start_date < today {
            return Err(ServiceError::ValidationError(
                "Start date cannot be in the past".to_string(),
            ));
        }

        let taken = promotion::Entity::find()
            .filter(promotion::Column::PromoCode.eq(&code))
            .filter(promotion::Column::PromoId.ne(promo_id))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Promotion code {} already exists",
                code
            )));
        }

        let mut active: promotion::ActiveModel = existing.into();
        active.promo_code = Set(code);
        active.description = Set(request.description);
        active.discount_type = Set(request.discount_type);
        active.discount_value = Set(request.discount_value);
        active.start_date = Set(request.start_date);
        active.end_date = Set(request.end_date);
        active.min_order_amount = Set(request.min_order_amount);
        active.usage_limit = Set(request.usage_limit);
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Deletes a promotion; orders that used it keep their recorded
    /// discount and drop the reference.
    #[instrument(skip(self))]
    pub async fn delete(&self, promo_id: i32) -> Result<(), ServiceError> {
        let result = promotion::Entity::delete_by_id(promo_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Promotion #{} not found",
                promo_id
            )));
        }

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::PromotionDeleted(promo_id)).await;
        }

        Ok(())
    }
}

fn validate_discount_value(
    discount_type: DiscountType,
    discount_value: Decimal,
) -> Result<(), ServiceError> {
    match discount_type {
        DiscountType::Percent => {
            if discount_value < Decimal::ZERO || discount_value > Decimal::from(100) {
                return Err(ServiceError::ValidationError(
                    "Percent discount must be between 0 and 100".to_string(),
                ));
            }
        }
        DiscountType::Fixed => {
            if discount_value < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Fixed discount cannot be negative".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn promotion(
        discount_type: DiscountType,
        discount_value: Decimal,
        min_order_amount: Decimal,
    ) -> promotion::Model {
        let today = Utc::now().date_naive();
        promotion::Model {
            promo_id: 1,
            promo_code: "WELCOME10".to_string(),
            description: None,
            discount_type,
            discount_value,
            start_date: today,
            end_date: today + chrono::Duration::days(1),
            min_order_amount,
            usage_limit: 0,
            used_count: 0,
            status: PromotionStatus::Active,
        }
    }

    #[test]
    fn percent_discount_is_proportional() {
        let promo = promotion(DiscountType::Percent, dec!(10), dec!(0));
        assert_eq!(calculate_discount(&promo, dec!(200000)), dec!(20000));
    }

    #[test]
    fn percent_discount_rounds_to_cents() {
        let promo = promotion(DiscountType::Percent, dec!(33), dec!(0));
        assert_eq!(calculate_discount(&promo, dec!(99.99)), dec!(33.00));
    }

    #[test]
    fn fixed_discount_clamps_to_the_subtotal() {
        let promo = promotion(DiscountType::Fixed, dec!(150000), dec!(0));
        assert_eq!(calculate_discount(&promo, dec!(100000)), dec!(100000));
    }

    #[test]
    fn negative_discount_value_never_produces_a_negative_discount() {
        let promo = promotion(DiscountType::Fixed, dec!(-5), dec!(0));
        assert_eq!(calculate_discount(&promo, dec!(100)), Decimal::ZERO);
    }

    #[rstest]
    #[case(dec!(99999), false)]
    #[case(dec!(100000), true)]
    #[case(dec!(100001), true)]
    fn minimum_order_amount_is_an_inclusive_threshold(
        #[case] subtotal: Decimal,
        #[case] expected_valid: bool,
    ) {
        let promo = promotion(DiscountType::Percent, dec!(10), dec!(100000));
        let today = Utc::now().date_naive();
        let result = assess(Some(promo), "WELCOME10", subtotal, today, false);
        assert_eq!(result.is_valid, expected_valid);
        if !expected_valid {
            assert_eq!(
                result.message,
                "Minimum order of 100,000 required to apply this code."
            );
        }
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, true)]
    #[case(-1, false)]
    #[case(2, false)]
    fn validity_window_includes_both_endpoint_days(
        #[case] days_after_start: i64,
        #[case] expected_valid: bool,
    ) {
        let promo = promotion(DiscountType::Percent, dec!(10), dec!(0));
        let today = promo.start_date + chrono::Duration::days(days_after_start);
        let result = assess(Some(promo), "WELCOME10", dec!(1000), today, false);
        assert_eq!(result.is_valid, expected_valid);
        if !expected_valid {
            assert_eq!(result.message, "Promotion code has expired.");
        }
    }

    #[test]
    fn unknown_code_is_reported_as_nonexistent() {
        let today = Utc::now().date_naive();
        let result = assess(None, "NOPE", dec!(1000), today, false);
        assert!(!result.is_valid);
        assert_eq!(result.message, "Promotion code does not exist.");
    }

    #[test]
    fn usage_limit_is_ignored_unless_the_policy_is_on() {
        let mut promo = promotion(DiscountType::Percent, dec!(10), dec!(0));
        promo.usage_limit = 5;
        promo.used_count = 5;
        let today = Utc::now().date_naive();

        let lenient = assess(Some(promo.clone()), "WELCOME10", dec!(1000), today, false);
        assert!(lenient.is_valid);

        let strict = assess(Some(promo), "WELCOME10", dec!(1000), today, true);
        assert!(!strict.is_valid);
        assert_eq!(strict.message, "Promotion code usage limit reached.");
    }

    #[test]
    fn zero_percent_code_is_rejected_as_not_reducing_the_order() {
        let promo = promotion(DiscountType::Percent, dec!(0), dec!(0));
        let today = Utc::now().date_naive();
        let result = assess(Some(promo), "WELCOME10", dec!(1000), today, false);
        assert!(!result.is_valid);
        assert_eq!(
            result.message,
            "Promotion code WELCOME10 does not reduce this order."
        );
    }

    #[test]
    fn applied_message_names_the_code() {
        let promo = promotion(DiscountType::Fixed, dec!(500), dec!(0));
        let today = Utc::now().date_naive();
        let result = assess(Some(promo), "WELCOME10", dec!(1000), today, false);
        assert!(result.is_valid);
        assert_eq!(result.discount, dec!(500));
        assert_eq!(result.message, "Promotion code WELCOME10 applied.");
    }

    #[rstest]
    #[case(dec!(100000), "100,000")]
    #[case(dec!(1234567.50), "1,234,567.5")]
    #[case(dec!(999), "999")]
    #[case(dec!(0), "0")]
    fn amounts_format_with_thousands_separators(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(format_amount(amount), expected);
    }
}
