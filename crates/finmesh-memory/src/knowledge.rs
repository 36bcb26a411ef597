//! Seed knowledge base: bank policies and FAQs owned by `system`.

use crate::document::DocumentType;

/// Policy and FAQ entries loaded once at startup.
pub fn seed_entries() -> Vec<(DocumentType, &'static str, &'static str)> {
    vec![
        (
            DocumentType::Policy,
            "transfer-limits",
            "Transfer limits: NEFT and IMPS transfers are capped at 100,000 INR per \
             transaction and 200,000 INR aggregate per day. RTGS requires a minimum of \
             200,000 INR and is processed only during RTGS business hours. UPI transfers \
             are capped at 100,000 INR per day across all apps.",
        ),
        (
            DocumentType::Policy,
            "kyc-requirements",
            "KYC requirements: a verified KYC status is mandatory for outward transfers, \
             beneficiary management and loan applications. Accounts with pending or \
             expired KYC are restricted to balance inquiry and statements until \
             re-verification completes.",
        ),
        (
            DocumentType::Policy,
            "fees-and-charges",
            "Fees and charges: NEFT transfers up to 10,000 INR incur 2.50 INR plus GST; \
             larger slabs up to 25 INR plus GST. IMPS carries a flat 5 INR fee. UPI \
             transfers are free. Statement copies beyond one per month incur 50 INR.",
        ),
        (
            DocumentType::Policy,
            "account-closure",
            "Account closure: accounts may be closed at any branch with photo id. \
             Closure within 14 days of opening is free; closure between 15 days and one \
             year incurs 500 INR. Pending standing instructions and linked deposits must \
             be settled first.",
        ),
        (
            DocumentType::Policy,
            "fixed-deposit-terms",
            "Fixed deposit terms: tenures range from 7 days to 10 years. Premature \
             withdrawal incurs a 1% interest penalty. Interest is compounded quarterly \
             and senior citizens earn an additional 0.5%.",
        ),
        (
            DocumentType::Faq,
            "faq-balance-check",
            "How do I check my balance? Use the mobile app dashboard, net banking \
             account summary, SMS BAL to the registered short code, or any ATM of the \
             bank network.",
        ),
        (
            DocumentType::Faq,
            "faq-transfer-times",
            "How long do transfers take? IMPS and UPI are instant, 24x7. NEFT settles \
             in half-hourly batches. RTGS is real-time during business hours. Transfers \
             initiated outside windows queue for the next settlement cycle.",
        ),
        (
            DocumentType::Faq,
            "faq-password-reset",
            "How do I reset my password? Use 'Forgot password' on the login screen; you \
             will need your registered mobile number for OTP verification and your debit \
             card details to set a new password.",
        ),
        (
            DocumentType::Faq,
            "faq-beneficiaries",
            "How do I add a beneficiary? Go to Payments > Manage beneficiaries, provide \
             the account number, name and IFSC, and confirm with OTP. New beneficiaries \
             are activated after a 30-minute cooling period with a 50,000 INR limit for \
             the first 24 hours.",
        ),
        (
            DocumentType::Faq,
            "faq-statement-download",
            "How do I download statements? In the app, open Accounts > Statements, pick \
             a date range and export as PDF or CSV. Net banking offers the same under \
             the account details page.",
        ),
        (
            DocumentType::Faq,
            "faq-loan-eligibility",
            "Am I eligible for a loan? Eligibility depends on credit score (600 \
             minimum), income, existing EMI obligations and account history. Use the \
             loan eligibility checker in the app for an instant pre-assessment.",
        ),
        (
            DocumentType::Faq,
            "faq-credit-score",
            "What is my credit score? The app shows your bureau credit score refreshed \
             monthly under Services > Credit score. Scores above 750 qualify for the \
             best loan rates.",
        ),
    ]
}
