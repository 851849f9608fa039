pub mod clients;
pub mod contract_installments;
pub mod contracts;
pub mod coupons;
pub mod enums;
pub mod pending_payments;
pub mod pets;
pub mod plans;

pub use clients as client_entity;
pub use contract_installments as installment_entity;
pub use contracts as contract_entity;
pub use coupons as coupon_entity;
pub use enums::*;
pub use pending_payments as pending_payment_entity;
pub use pets as pet_entity;
pub use plans as plan_entity;
