//! Catalog of case type designations accepted by the court's search form.
//!
//! The remote form only accepts values from its dropdown; submitting an
//! unknown designation wastes a captcha exchange, so the catalog is
//! checked before any network interaction. The list mirrors the Delhi
//! High Court filing categories.

/// Case type designations, in the order the court lists them.
pub const CASE_TYPES: &[&str] = &[
    "ADMIN.REPORT",
    "ARB.A.",
    "ARB. A. (COMM.)",
    "ARB.P.",
    "BAIL APPLN.",
    "CA",
    "CA (COMM.IPD-CR)",
    "C.A.(COMM.IPD-GI)",
    "C.A.(COMM.IPD-PAT)",
    "C.A.(COMM.IPD-PV)",
    "C.A.(COMM.IPD-TM)",
    "CAVEAT(CO.)",
    "CC(ARB.)",
    "CCP(CO.)",
    "CCP(REF)",
    "CEAC",
    "CEAR",
    "CHAT.A.C.",
    "CHAT.A.REF",
    "CMI",
    "CM(M)",
    "CM(M)-IPD",
    "C.O.",
    "CO.APP.",
    "CO.APPL.(C)",
    "CO.APPL.(M)",
    "CO.A(SB)",
    "C.O.(COMM.IPD-CR)",
    "C.O.(COMM.IPD-GI)",
    "C.O.(COMM.IPD-PAT)",
    "C.O. (COMM.IPD-TM)",
    "CO.EX.",
    "CONT.APP.(C)",
    "CONT.CAS(C)",
    "CONT.CAS.(CRL)",
    "CO.PET.",
    "C.REF.(O)",
    "CRL.A.",
    "CRL.L.P.",
    "CRL.M.C.",
    "CRL.M.(CO.)",
    "CRL.M.I.",
    "CRL.O.",
    "CRL.O.(CO.)",
    "CRL.REF.",
    "CRL.REV.P.",
    "CRL.REV.P.(MAT.)",
    "CRL.REV.P.(NDPS)",
    "CRL.REV.P.(NI)",
    "C.R.P.",
    "CRP-IPD",
    "C.RULE",
    "CS(COMM)",
    "CS(OS)",
    "CS(OS) GP",
    "CUSAA",
    "CUS.A.C.",
    "CUS.A.R.",
    "CUSTOM A.",
    "DEATH SENTENCE REF.",
    "W.P.(C)",
    "W.P.(C)-IPD",
    "W.P.(CRL)",
];

/// Whether a designation is in the catalog.
#[must_use]
pub fn is_known(case_type: &str) -> bool {
    CASE_TYPES.contains(&case_type)
}
