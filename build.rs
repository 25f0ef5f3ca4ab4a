#![recursion_limit = "512"]

use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        rustcrypto_sign_base: {
            any(
                feature = "rustcrypto-ecdsa",
                feature = "rustcrypto-eddsa"
            )
        },
        rustcrypto_mac_base: {
            any(
                feature = "rustcrypto-hmac"
            )
        },
        rustcrypto_x509_base: {
            any(
                feature = "rustcrypto-x509"
            )
        },
        rustcrypto_base: {
            any(
                rustcrypto_sign_base,
                rustcrypto_mac_base,
                rustcrypto_x509_base
            )
        },
    }
}
