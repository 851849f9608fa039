use crate::entities::coupon_entity;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Looks up an applicable coupon. Codes are matched case-insensitively by
    /// storing and querying them upper-case.
    pub async fn validate(&self, code: &str) -> AppResult<coupon_entity::Model> {
        let code = code.trim().to_uppercase();
        let coupon = coupon_entity::Entity::find()
            .filter(coupon_entity::Column::Code.eq(&code))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::validation(format!("Cupom {code} não encontrado")))?;

        check_applicable(&coupon, Utc::now())?;
        Ok(coupon)
    }

    pub async fn increment_usage(&self, code: &str) -> AppResult<()> {
        let code = code.trim().to_uppercase();
        let result = coupon_entity::Entity::update_many()
            .col_expr(
                coupon_entity::Column::UsageCount,
                Expr::col(coupon_entity::Column::UsageCount).add(1),
            )
            .col_expr(coupon_entity::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupon_entity::Column::Code.eq(&code))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            log::warn!("Coupon {code} not found while incrementing usage");
        }
        Ok(())
    }
}

pub fn check_applicable(coupon: &coupon_entity::Model, now: DateTime<Utc>) -> AppResult<()> {
    if !coupon.is_active {
        return Err(AppError::validation(format!("Cupom {} inativo", coupon.code)));
    }
    if coupon.valid_from.is_some_and(|from| now < from) {
        return Err(AppError::validation(format!(
            "Cupom {} ainda não é válido",
            coupon.code
        )));
    }
    if coupon.valid_until.is_some_and(|until| now > until) {
        return Err(AppError::validation(format!("Cupom {} expirado", coupon.code)));
    }
    if coupon
        .max_uses
        .is_some_and(|max| coupon.usage_count >= max)
    {
        return Err(AppError::validation(format!(
            "Cupom {} esgotado",
            coupon.code
        )));
    }
    if coupon.value < 0.0 {
        return Err(AppError::validation(format!("Cupom {} inválido", coupon.code)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CouponType;
    use chrono::Duration;

    fn coupon() -> coupon_entity::Model {
        let now = Utc::now();
        coupon_entity::Model {
            id: 1,
            code: "PROMO10".into(),
            discount_type: CouponType::Percentage,
            value: 10.0,
            is_active: true,
            max_uses: Some(5),
            usage_count: 0,
            valid_from: None,
            valid_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_coupon_applies() {
        assert!(check_applicable(&coupon(), Utc::now()).is_ok());
    }

    #[test]
    fn test_exhausted_coupon_is_rejected() {
        let mut c = coupon();
        c.usage_count = 5;
        assert!(check_applicable(&c, Utc::now()).is_err());
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let mut c = coupon();
        c.valid_until = Some(now - Duration::days(1));
        assert!(check_applicable(&c, now).is_err());

        let mut c = coupon();
        c.valid_from = Some(now + Duration::days(1));
        assert!(check_applicable(&c, now).is_err());
    }

    #[test]
    fn test_inactive_coupon_is_rejected() {
        let mut c = coupon();
        c.is_active = false;
        assert!(check_applicable(&c, Utc::now()).is_err());
    }
}
