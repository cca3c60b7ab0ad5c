use crate::application::events::{self, Event};
use crate::application::ledger::{PaymentLedger, SubmitPayment};
use crate::application::refunds::RefundManager;
use crate::application::verification::VerificationWorkflow;
use crate::domain::catalog::{Bundle, Course};
use crate::domain::method::PaymentMethodConfig;
use crate::domain::ports::{
    CatalogStoreRef, EnrollmentRef, HistoryStoreRef, MethodConfigStoreRef, NotifierRef,
    PromoStoreRef, RefundStoreRef, TransactionStoreRef,
};
use crate::domain::pricing::Discount;
use crate::domain::promo::PromoCode;
use crate::domain::transaction::PaymentTransaction;
use crate::error::{PaymentError, Result};
use chrono::Utc;

/// Every handle the engine needs: the six stores plus the two external
/// collaborators.
pub struct EngineDeps {
    pub promos: PromoStoreRef,
    pub catalog: CatalogStoreRef,
    pub transactions: TransactionStoreRef,
    pub history: HistoryStoreRef,
    pub refunds: RefundStoreRef,
    pub methods: MethodConfigStoreRef,
    pub enrollment: EnrollmentRef,
    pub notifier: NotifierRef,
}

/// The main entry point for the payment core.
///
/// `PaymentEngine` owns the storage backends, composes the ledger,
/// verification and refund services over them, and applies boundary events
/// one at a time. Each event is independent; a failing event leaves every
/// record untouched and does not stop the stream.
pub struct PaymentEngine {
    promos: PromoStoreRef,
    catalog: CatalogStoreRef,
    transactions: TransactionStoreRef,
    methods: MethodConfigStoreRef,
    ledger: PaymentLedger,
    verification: VerificationWorkflow,
    refunds: RefundManager,
}

impl PaymentEngine {
    pub fn new(deps: EngineDeps) -> Self {
        let ledger = PaymentLedger::new(
            deps.transactions.clone(),
            deps.history.clone(),
            deps.catalog.clone(),
            deps.methods.clone(),
            deps.promos.clone(),
        );
        let verification = VerificationWorkflow::new(
            deps.transactions.clone(),
            deps.history.clone(),
            deps.promos.clone(),
            deps.enrollment,
            deps.notifier.clone(),
        );
        let refunds = RefundManager::new(
            deps.refunds,
            deps.transactions.clone(),
            deps.history,
            deps.notifier,
        );
        Self {
            promos: deps.promos,
            catalog: deps.catalog,
            transactions: deps.transactions,
            methods: deps.methods,
            ledger,
            verification,
            refunds,
        }
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    pub fn verification(&self) -> &VerificationWorkflow {
        &self.verification
    }

    pub fn refunds(&self) -> &RefundManager {
        &self.refunds
    }

    /// Applies one boundary event. Admin events upsert catalog, promo and
    /// method records; learner and admin payment events run through the
    /// services.
    pub async fn apply(&self, event: Event) -> Result<()> {
        let now = event.at().unwrap_or_else(Utc::now);
        match event {
            Event::Course {
                id,
                title,
                price,
                duration_minutes,
                is_published,
                ..
            } => {
                let course = Course::new(id, title, price, duration_minutes, is_published)?;
                self.catalog.upsert_course(course).await
            }
            Event::Bundle {
                id,
                title,
                price_override,
                discount_percentage,
                course_ids,
                ..
            } => {
                let mut courses = Vec::with_capacity(course_ids.len());
                for course_id in &course_ids {
                    let course = self.catalog.course(course_id).await?.ok_or_else(|| {
                        PaymentError::NotFound(format!("course '{course_id}'"))
                    })?;
                    courses.push(course);
                }
                let bundle = Bundle::new(
                    id,
                    title,
                    price_override,
                    discount_percentage,
                    &courses,
                    now,
                )?;
                self.catalog.upsert_bundle(bundle).await
            }
            Event::Promo {
                code,
                description,
                discount_type,
                discount_value,
                applicable_type,
                applicable_ids,
                max_uses,
                valid_until,
                is_active,
                ..
            } => {
                if code.trim().is_empty() {
                    return Err(PaymentError::Validation("promo code must not be empty".into()));
                }
                // Bounds-check the discount before anything is stored.
                Discount::new(discount_type, discount_value)?;
                let scope = events::promo_scope(applicable_type, applicable_ids)?;
                // The store keeps the id and used_count of an existing code.
                self.promos
                    .upsert(PromoCode {
                        id: 0,
                        code,
                        description,
                        discount_type,
                        discount_value,
                        scope,
                        max_uses,
                        used_count: 0,
                        valid_until,
                        is_active,
                        created_at: now,
                    })
                    .await?;
                Ok(())
            }
            Event::Method {
                method,
                display_name,
                is_enabled,
                min_amount,
                max_amount,
                processing_fee_percent,
                ..
            } => {
                let config = PaymentMethodConfig::new(
                    method,
                    display_name,
                    is_enabled,
                    min_amount,
                    max_amount,
                    processing_fee_percent,
                )?;
                self.methods.upsert(config).await
            }
            Event::Submit {
                user,
                target_type,
                target_id,
                method,
                reference,
                proof_url,
                promo,
                notes,
                ..
            } => {
                self.ledger
                    .submit(
                        SubmitPayment {
                            user_id: user,
                            target: events::target(target_type, target_id),
                            payment_method: method,
                            payment_reference: reference,
                            payment_proof_url: proof_url,
                            promo_code: promo,
                            notes,
                        },
                        now,
                    )
                    .await?;
                Ok(())
            }
            Event::Approve {
                tx, admin, notes, ..
            } => {
                self.verification.approve(tx, &admin, notes, now).await?;
                Ok(())
            }
            Event::Reject {
                tx, admin, reason, ..
            } => {
                self.verification.reject(tx, &admin, &reason, now).await?;
                Ok(())
            }
            Event::Cancel { tx, user, .. } => {
                self.ledger.cancel(tx, &user, now).await?;
                Ok(())
            }
            Event::RefundRequest {
                tx,
                user,
                amount,
                reason,
                ..
            } => {
                self.refunds
                    .request(tx, &user, amount, &reason, now)
                    .await?;
                Ok(())
            }
            Event::RefundDecide {
                refund,
                admin,
                approve,
                notes,
                ..
            } => {
                self.refunds
                    .decide(refund, &admin, approve, notes, now)
                    .await?;
                Ok(())
            }
        }
    }

    /// Final state of every transaction, sorted by id.
    pub async fn report(&self) -> Result<Vec<PaymentTransaction>> {
        let mut transactions = self.transactions.all().await?;
        transactions.sort_by_key(|tx| tx.id);
        Ok(transactions)
    }
}
