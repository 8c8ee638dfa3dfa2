//! TLS blocks of both trust domains

use tessera_common::crd::{TlsDomain, TlsModeKind};

use super::SpecView;
use crate::violation::{FieldPath, Violations};

pub(super) fn valid_tls_modes(view: &SpecView<'_>, out: &mut Violations) {
    for domain in TlsDomain::ALL {
        let Some(tls) = view.spec.tls(domain) else {
            continue;
        };
        if tls.mode.kind().is_none() {
            out.not_supported(
                FieldPath::spec().child(domain.spec_field()).child("mode"),
                &tls.mode,
                format!(
                    "tls mode must be one of: {} (case-insensitive)",
                    TlsModeKind::KNOWN.join(", ")
                ),
            );
        }
    }
}

pub(super) fn valid_auto_rotate(view: &SpecView<'_>, out: &mut Violations) {
    for domain in TlsDomain::ALL {
        let Some(rotate) = view.spec.tls(domain).and_then(|t| t.auto_rotate.as_ref()) else {
            continue;
        };
        let path = FieldPath::spec().child(domain.spec_field()).child("autoRotate");
        if rotate.secrets.is_empty() {
            out.required(
                path.child("secrets"),
                "autoRotate needs at least one secret to rotate through",
            );
        }
        for (i, secret) in rotate.secrets.iter().enumerate() {
            if secret.is_empty() {
                out.required(path.child("secrets").index(i), "secret names cannot be empty");
            }
        }
        if rotate.interval_hours <= 0 {
            out.invalid(
                path.child("intervalHours"),
                rotate.interval_hours,
                "intervalHours must be greater than 0",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::validate_static;
    use tessera_common::crd::{AutoRotate, TlsConfigSpec, TlsMode};

    #[test]
    fn test_tls_mode_is_case_insensitive() {
        let mut db = valid_db();
        db.spec.https_tls = Some(TlsConfigSpec {
            mode: TlsMode::new("VERIFY_CA"),
            ..Default::default()
        });
        assert!(validate_static(&db).is_empty());

        db.spec.client_server_tls = Some(TlsConfigSpec {
            mode: TlsMode::new("verify"),
            ..Default::default()
        });
        assert!(validate_static(&db).has_path("spec.clientServerTls.mode"));
    }

    #[test]
    fn test_auto_rotate_sanity() {
        let mut db = valid_db();
        db.spec.https_tls = Some(TlsConfigSpec {
            auto_rotate: Some(AutoRotate {
                secrets: vec![],
                interval_hours: 0,
            }),
            ..Default::default()
        });
        let violations = validate_static(&db);
        assert!(violations.has_path("spec.httpsTls.autoRotate.secrets"));
        assert!(violations.has_path("spec.httpsTls.autoRotate.intervalHours"));
    }
}
