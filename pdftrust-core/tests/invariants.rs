//! Property-based tests for validation invariants.
//!
//! These tests verify:
//! 1. Report aggregation - the worst item decides the result
//! 2. Freshness - evidence is accepted exactly up to the freshness limit
//! 3. Reasons masks - accumulation only grows and stays within the known flags
//! 4. DocMDP monotonicity - permissions only narrow
//! 5. Unchanged revisions never produce failures

mod common;

use chrono::Duration;
use common::objects::*;
use common::*;
use proptest::prelude::*;
use pdftrust::document::XrefEntry;
use pdftrust::revocation::OcspEvidence;
use pdftrust::{
    AccessPermissions, DocumentRevisionsValidator, InMemoryHistory, OcspCertStatus, PdfObject,
    ReasonsMask, ReportItem, ReportItemStatus, TimeBasedContext, ValidationContext,
    ValidationReport, ValidationResult, ValidationSession,
};

// ============================================================================
// Strategies for generating test data
// ============================================================================

fn arb_status() -> impl Strategy<Value = ReportItemStatus> {
    prop_oneof![
        Just(ReportItemStatus::Info),
        Just(ReportItemStatus::Indeterminate),
        Just(ReportItemStatus::Invalid),
    ]
}

fn arb_permissions() -> impl Strategy<Value = AccessPermissions> {
    prop_oneof![
        Just(AccessPermissions::NoChangesPermitted),
        Just(AccessPermissions::FormFieldsModification),
        Just(AccessPermissions::AnnotationModification),
    ]
}

fn arb_mask() -> impl Strategy<Value = ReasonsMask> {
    any::<u32>().prop_map(ReasonsMask::from_bits)
}

// ============================================================================
// Invariant 1: Report aggregation
// ============================================================================

proptest! {
    #[test]
    fn result_is_decided_by_worst_item(statuses in prop::collection::vec(arb_status(), 0..12)) {
        let mut report = ValidationReport::new();
        for (i, status) in statuses.iter().enumerate() {
            report.add(ReportItem::new("check", format!("item {}", i), *status));
        }

        let expected = if statuses.contains(&ReportItemStatus::Invalid) {
            ValidationResult::Invalid
        } else if statuses.contains(&ReportItemStatus::Indeterminate) {
            ValidationResult::Indeterminate
        } else {
            ValidationResult::Valid
        };
        prop_assert_eq!(report.validation_result(), expected);
        prop_assert_eq!(report.items().len(), statuses.len());
    }

    #[test]
    fn merging_keeps_every_item(
        left in prop::collection::vec(arb_status(), 0..6),
        right in prop::collection::vec(arb_status(), 0..6),
    ) {
        let build = |statuses: &[ReportItemStatus]| {
            let mut report = ValidationReport::new();
            for status in statuses {
                report.add(ReportItem::new("check", "item", *status));
            }
            report
        };
        let mut merged = build(&left);
        merged.merge(build(&right));
        prop_assert_eq!(merged.items().len(), left.len() + right.len());
        prop_assert!(merged.validation_result() >= build(&left).validation_result());
    }
}

// ============================================================================
// Invariant 2: Freshness
// ============================================================================

proptest! {
    /// An OCSP response is fresh exactly while its age is within 30 days.
    #[test]
    fn ocsp_accepted_within_freshness(age_minutes in 0i64..(60 * 24 * 60)) {
        let pki = Pki::new();
        let chain = pki.builder().build().unwrap();
        let response = ocsp_response(
            &pki.leaf,
            &pki.ca,
            &pki.ca,
            OcspCertStatus::Good,
            now() - Duration::minutes(age_minutes),
        );
        let evidence = OcspEvidence {
            single: response.responses[0].clone(),
            response,
            generation_date: now(),
            time: TimeBasedContext::Present,
        };

        let mut report = ValidationReport::new();
        chain.ocsp_validator().validate(
            &mut report,
            &mut ValidationSession::new(),
            ValidationContext::signer(),
            &pki.leaf,
            &evidence,
            now(),
        );

        let fresh = Duration::minutes(age_minutes) <= Duration::days(30);
        prop_assert_eq!(report.validation_result() == ValidationResult::Valid, fresh);
    }
}

// ============================================================================
// Invariant 3: Reasons masks
// ============================================================================

proptest! {
    #[test]
    fn reasons_union_only_grows(a in arb_mask(), b in arb_mask()) {
        let union = a.union(b);
        prop_assert!(union.contains(a));
        prop_assert!(union.contains(b));
        prop_assert_eq!(union, b.union(a));
        prop_assert_eq!(union.union(a), union);
        prop_assert!(ReasonsMask::ALL.contains(union));
    }

    #[test]
    fn from_bits_drops_unknown_flags(bits in any::<u32>()) {
        let mask = ReasonsMask::from_bits(bits);
        prop_assert!(ReasonsMask::ALL.contains(mask));
        prop_assert_eq!(mask.bits() & ReasonsMask::UNUSED, 0);
    }
}

// ============================================================================
// Invariant 4: DocMDP monotonicity
// ============================================================================

fn used(numbers: &[u32]) -> Vec<XrefEntry> {
    numbers.iter().map(|n| XrefEntry::in_use(oref(*n))).collect()
}

fn certified_history(p: i64) -> InMemoryHistory {
    let mut history = InMemoryHistory::new();
    history
        .push(1000, used(&[1, 2, 3, 4, 5, 6, 8]), base_document())
        .push(2000, used(&[SIG_FIELD, SIG_VALUE]), signed_document(2000, Some(p)));
    history
}

proptest! {
    #[test]
    fn p_values_map_to_known_levels(p in any::<i64>()) {
        let level = AccessPermissions::from_p(p);
        prop_assert_eq!(level == AccessPermissions::NoChangesPermitted, p == 1);
        prop_assert_eq!(level == AccessPermissions::AnnotationModification, p == 3);
    }

    /// Filling a field is allowed exactly when both the requested ceiling and
    /// the certification level permit form filling.
    #[test]
    fn form_filling_follows_narrowest_level(p in 1i64..=3, ceiling in arb_permissions()) {
        let mut history = certified_history(p);
        let mut next = signed_document(2000, Some(p));
        set_entry(&mut next, TEXT_FIELD, "V", PdfObject::string("filled"));
        history.push(3000, used(&[TEXT_FIELD]), next);

        let report = DocumentRevisionsValidator::new()
            .with_access_permissions(ceiling)
            .validate_all_document_revisions(&history);

        let effective = ceiling.min(AccessPermissions::from_p(p));
        let allowed = effective >= AccessPermissions::FormFieldsModification;
        prop_assert_eq!(report.validation_result() == ValidationResult::Valid, allowed);
    }

    #[test]
    fn annotations_follow_narrowest_level(p in 1i64..=3, ceiling in arb_permissions()) {
        let mut history = certified_history(p);
        let mut next = signed_document(2000, Some(p));
        next.insert(
            oref(ANNOTATION),
            dict(&[("Type", PdfObject::name("Annot")), ("Subtype", PdfObject::name("Square"))]),
        );
        set_entry(&mut next, PAGE, "Annots", array([r(TEXT_FIELD), r(SIG_FIELD), r(ANNOTATION)]));
        history.push(3000, used(&[PAGE, ANNOTATION]), next);

        let report = DocumentRevisionsValidator::new()
            .with_access_permissions(ceiling)
            .validate_all_document_revisions(&history);

        let effective = ceiling.min(AccessPermissions::from_p(p));
        let allowed = effective == AccessPermissions::AnnotationModification;
        prop_assert_eq!(report.validation_result() == ValidationResult::Valid, allowed);
    }
}

// ============================================================================
// Invariant 5: Unchanged revisions
// ============================================================================

proptest! {
    #[test]
    fn identical_revision_has_no_failures(
        p in prop::option::of(1i64..=3),
        value in "[A-Za-z ]{0,24}",
        producer in "[a-z]{1,12}",
        rewritten in prop::collection::vec(1u32..=8, 0..6),
    ) {
        let mut signed = signed_document(2000, p);
        set_entry(&mut signed, TEXT_FIELD, "V", PdfObject::string(value.as_str()));
        set_entry(&mut signed, INFO, "Producer", PdfObject::string(producer.as_str()));

        let mut history = InMemoryHistory::new();
        history
            .push(1000, used(&[1, 2, 3, 4, 5, 6, 8]), base_document())
            .push(2000, used(&[SIG_FIELD, SIG_VALUE, TEXT_FIELD, INFO]), signed.clone())
            .push(3000, used(&rewritten), signed);

        let report = DocumentRevisionsValidator::new().validate_all_document_revisions(&history);
        prop_assert!(report.failures().next().is_none(), "{:#?}", report);
    }
}
