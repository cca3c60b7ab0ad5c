use crate::domain::transaction::PaymentTransaction;
use crate::error::Result;
use std::io::Write;

/// Writes the final transaction report as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(dest: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(dest),
        }
    }

    pub fn write_report(&mut self, transactions: &[PaymentTransaction]) -> Result<()> {
        self.writer.write_record([
            "id",
            "user",
            "target",
            "method",
            "original",
            "discount",
            "amount",
            "status",
            "verification",
        ])?;
        for tx in transactions {
            self.writer.write_record([
                tx.id.to_string(),
                tx.user_id.clone(),
                tx.target.to_string(),
                tx.payment_method.clone(),
                tx.original_amount.to_string(),
                tx.discount_amount.to_string(),
                tx.amount.to_string(),
                tx.status.to_string(),
                tx.verification_status.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
