/// CBOR tag numbers with built-in handlers, as listed in the
/// [IANA CBOR Tags registry](https://www.iana.org/assignments/cbor-tags/cbor-tags.xhtml).
pub mod tags {
    /// Standard date/time string, see section 3.4.1 of
    /// [RFC 8949](https://www.rfc-editor.org/rfc/rfc8949.html#section-3.4.1).
    pub const DATE_TIME: u64 = 0;

    /// `COSE_Mac0` structure, see section 6.2 of
    /// [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-6.2).
    pub const COSE_MAC0: u64 = 17;

    /// `COSE_Sign1` structure, see section 4.2 of
    /// [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-4.2).
    pub const COSE_SIGN1: u64 = 18;

    /// Encoded CBOR data item, see section 3.4.5.1 of
    /// [RFC 8949](https://www.rfc-editor.org/rfc/rfc8949.html#section-3.4.5.1).
    pub const EMBEDDED_CBOR: u64 = 24;

    /// Map datatype with key-value operations.
    pub const MAP: u64 = 259;

    /// Full-date string, see [RFC 8943](https://www.rfc-editor.org/rfc/rfc8943.html).
    pub const FULL_DATE: u64 = 1004;
}

/// Context strings of the structures which are actually signed or MACed.
pub(crate) mod context {
    /// Context of the `Sig_structure` for `COSE_Sign1`.
    pub const SIGNATURE1: &str = "Signature1";

    /// Context of the `MAC_structure` for `COSE_Mac0`.
    pub const MAC0: &str = "MAC0";
}

/// COSE header labels which `coset::iana::HeaderParameter` doesn't cover.
pub(crate) mod header_labels {
    /// See section 4.5 of [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-4.5).
    pub const COUNTER_SIGNATURE0: i64 = 9;

    /// See section 3 of [RFC 9338](https://www.rfc-editor.org/rfc/rfc9338.html#section-3).
    pub const COUNTER_SIGNATURE_V2: i64 = 11;

    /// See section 3 of [RFC 9338](https://www.rfc-editor.org/rfc/rfc9338.html#section-3).
    pub const COUNTER_SIGNATURE0_V2: i64 = 12;

    /// See section 2 of [RFC 9360](https://www.rfc-editor.org/rfc/rfc9360.html#section-2).
    pub const X5CHAIN: i64 = 33;
}

/// COSE_Key parameter labels, see section 7.1 of
/// [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-7.1).
pub(crate) mod key_labels {
    pub const KTY: i64 = 1;
    pub const KID: i64 = 2;
    pub const ALG: i64 = 3;
    pub const KEY_OPS: i64 = 4;
    pub const CRV: i64 = -1;
    pub const K: i64 = -1;
    pub const X: i64 = -2;
    pub const Y: i64 = -3;
    pub const D: i64 = -4;
}
