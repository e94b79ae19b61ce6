//! VietQR payment reference generation.
//!
//! Builds the third-party QR image URL for the deposit or a specific
//! phase. Display convenience only: nothing validates the rendered
//! image, and payment confirmation stays a human action.

use rust_decimal::Decimal;

use crate::config::BankConfig;
use crate::domain::proposal::Proposal;
use crate::errors::DomainError;

const VIETQR_BASE: &str = "https://img.vietqr.io/image";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentPurpose {
    Deposit,
    Phase(usize),
}

/// Transfer memo the customer must keep verbatim so the transfer can be
/// matched to the project.
pub fn payment_memo(proposal: &Proposal, purpose: PaymentPurpose) -> String {
    let short_ref = proposal.project_id.short_ref();
    match purpose {
        PaymentPurpose::Deposit => format!("Coc DuAn {short_ref}"),
        PaymentPurpose::Phase(index) => format!("GD{} {short_ref}", index + 1),
    }
}

#[derive(Clone, Debug)]
pub struct QrGenerator {
    bank_code: String,
    account_number: String,
    account_name: String,
    template: String,
}

impl QrGenerator {
    pub fn new(bank: &BankConfig) -> Self {
        Self {
            bank_code: bank.bank_code.clone(),
            account_number: bank.account_number.clone(),
            account_name: bank.account_name.clone(),
            template: bank.qr_template.clone(),
        }
    }

    pub fn deposit_url(&self, proposal: &Proposal) -> String {
        self.image_url(proposal.deposit_amount, &payment_memo(proposal, PaymentPurpose::Deposit))
    }

    pub fn phase_url(&self, proposal: &Proposal, index: usize) -> Result<String, DomainError> {
        let phase = proposal.phase(index)?;
        Ok(self.image_url(phase.amount, &payment_memo(proposal, PaymentPurpose::Phase(index))))
    }

    fn image_url(&self, amount: Decimal, memo: &str) -> String {
        format!(
            "{VIETQR_BASE}/{}-{}-{}.jpg?amount={}&addInfo={}&accountName={}",
            self.bank_code,
            self.account_number,
            self.template,
            amount.normalize(),
            encode_component(memo),
            encode_component(&self.account_name),
        )
    }
}

/// Percent-encode a query component. Unreserved characters pass through,
/// everything else becomes `%XX` per byte.
fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{byte:02X}"));
            }
        }
    }
    encoded
}
