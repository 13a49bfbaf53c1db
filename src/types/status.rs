//! Wire status codes and localized status labels.
//!
//! Every response carries a three-digit status code (as a string) plus a
//! human-readable label. Labels exist in French, English and Arabic; French
//! is the fallback for any other language, and a code without a table entry
//! echoes the code itself.

/// Operation completed successfully.
pub const SUCCESS: &str = "000";
/// Operation accepted but not yet settled.
pub const PENDING: &str = "001";
/// Batch outcome where some items succeeded and some failed.
pub const PARTIAL_SUCCESS: &str = "002";

/// Request body could not be understood at all.
pub const INVALID_REQUEST: &str = "100";
/// A required parameter is absent.
pub const MISSING_PARAMETER: &str = "101";
/// A parameter is present but unusable.
pub const INVALID_PARAMETER: &str = "102";
/// Amount is missing, unparsable or outside the allowed set.
pub const INVALID_AMOUNT: &str = "103";
/// Customer reference does not match the biller's format.
pub const INVALID_REFERENCE: &str = "104";
/// Phone number does not match the operator's format.
pub const INVALID_PHONE: &str = "105";

/// No biller configured under the given code.
pub const BILLER_NOT_FOUND: &str = "200";
/// Simulated transient outage of the biller.
pub const SERVICE_UNAVAILABLE: &str = "201";
/// No bill found for the customer reference.
pub const BILL_NOT_FOUND: &str = "202";
/// Bill was already settled.
pub const ALREADY_PAID: &str = "203";
/// Customer balance cannot cover the amount.
pub const INSUFFICIENT_FUNDS: &str = "204";
/// No transaction under the given identifier.
pub const TRANSACTION_NOT_FOUND: &str = "205";
/// Transaction exists but may not be cancelled.
pub const CANNOT_CANCEL: &str = "206";

/// Unexpected internal fault.
pub const SYSTEM_ERROR: &str = "500";
/// Simulated persistence fault.
pub const DATABASE_ERROR: &str = "501";
/// Simulated processing timeout.
pub const TIMEOUT: &str = "502";
/// Simulated upstream service fault.
pub const EXTERNAL_SERVICE_ERROR: &str = "503";

/// Localized labels as (fr, en, ar), `None` for codes without a table entry.
fn translations(code: &str) -> Option<(&'static str, &'static str, &'static str)> {
    let entry = match code {
        SUCCESS => ("Opération réussie", "Operation successful", "تمت العملية بنجاح"),
        MISSING_PARAMETER => ("Paramètre manquant", "Missing parameter", "معلمة مفقودة"),
        INVALID_PARAMETER => ("Paramètre invalide", "Invalid parameter", "معلمة غير صالحة"),
        INVALID_AMOUNT => (
            "Montant invalide ou manquant",
            "Invalid or missing amount",
            "المبلغ غير صالح أو مفقود",
        ),
        INVALID_REFERENCE => (
            "Référence client invalide",
            "Invalid customer reference",
            "مرجع العميل غير صالح",
        ),
        INVALID_PHONE => (
            "Numéro de téléphone invalide",
            "Invalid phone number",
            "رقم الهاتف غير صالح",
        ),
        BILLER_NOT_FOUND => ("Créancier introuvable", "Biller not found", "لم يتم العثور على المفوتر"),
        SERVICE_UNAVAILABLE => ("Service indisponible", "Service unavailable", "الخدمة غير متوفرة"),
        BILL_NOT_FOUND => ("Facture introuvable", "Bill not found", "لم يتم العثور على الفاتورة"),
        ALREADY_PAID => ("Déjà payée", "Already paid", "تم الدفع بالفعل"),
        INSUFFICIENT_FUNDS => ("Fonds insuffisants", "Insufficient funds", "رصيد غير كافٍ"),
        TRANSACTION_NOT_FOUND => (
            "Transaction introuvable",
            "Transaction not found",
            "لم يتم العثور على المعاملة",
        ),
        CANNOT_CANCEL => (
            "Impossible d'annuler la transaction",
            "Cannot cancel transaction",
            "لا يمكن إلغاء المعاملة",
        ),
        SYSTEM_ERROR => ("Erreur système", "System error", "خطأ في النظام"),
        DATABASE_ERROR => ("Erreur base de données", "Database error", "خطأ في قاعدة البيانات"),
        TIMEOUT => ("Délai dépassé", "Timeout", "انتهت المهلة"),
        EXTERNAL_SERVICE_ERROR => (
            "Erreur service externe",
            "External service error",
            "خطأ في الخدمة الخارجية",
        ),
        _ => return None,
    };
    Some(entry)
}

/// Returns the localized label for a status code.
///
/// The language is matched case-insensitively against `fr`, `en` and `ar`;
/// anything else falls back to French. An unknown code is echoed back.
pub fn label(code: &str, lang: &str) -> String {
    match translations(code) {
        Some((fr, en, ar)) => match lang.to_lowercase().as_str() {
            "en" => en.to_string(),
            "ar" => ar.to_string(),
            _ => fr.to_string(),
        },
        None => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::french(SUCCESS, "fr", "Opération réussie")]
    #[case::english(SUCCESS, "en", "Operation successful")]
    #[case::arabic(SUCCESS, "ar", "تمت العملية بنجاح")]
    #[case::uppercase_lang(MISSING_PARAMETER, "EN", "Missing parameter")]
    #[case::unknown_lang_falls_back(CANNOT_CANCEL, "de", "Impossible d'annuler la transaction")]
    #[case::empty_lang_falls_back(TIMEOUT, "", "Délai dépassé")]
    #[case::unknown_code_echoes("999", "fr", "999")]
    #[case::untranslated_code_echoes(INVALID_REQUEST, "en", "100")]
    fn label_resolution(#[case] code: &str, #[case] lang: &str, #[case] expected: &str) {
        assert_eq!(label(code, lang), expected);
    }

    #[test]
    fn all_translated_codes_have_three_languages() {
        for code in [
            SUCCESS,
            MISSING_PARAMETER,
            INVALID_PARAMETER,
            INVALID_AMOUNT,
            INVALID_REFERENCE,
            INVALID_PHONE,
            BILLER_NOT_FOUND,
            SERVICE_UNAVAILABLE,
            BILL_NOT_FOUND,
            ALREADY_PAID,
            INSUFFICIENT_FUNDS,
            TRANSACTION_NOT_FOUND,
            CANNOT_CANCEL,
            SYSTEM_ERROR,
            DATABASE_ERROR,
            TIMEOUT,
            EXTERNAL_SERVICE_ERROR,
        ] {
            let (fr, en, ar) = translations(code).unwrap();
            assert!(!fr.is_empty() && !en.is_empty() && !ar.is_empty());
        }
    }
}
