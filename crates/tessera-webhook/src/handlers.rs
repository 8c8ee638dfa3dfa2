//! TesseraDB admission handlers
//!
//! `/mutate` answers with a JSON patch from the submitted spec to its
//! defaulted form. `/validate` runs the static and transition rules and
//! denies with every violation found. The review functions are pure; the
//! axum handlers only unwrap and wrap the JSON bodies.

use axum::Json;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
    DynamicObject,
};
use tessera_admission::{defaulted, validate};
use tessera_common::crd::TesseraDB;
use tessera_common::Error;
use tracing::{debug, error, info};

use crate::error::WebhookError;

/// Handle mutating admission review for TesseraDB
pub async fn mutate_handler(
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    review_mutation(body).map(Json)
}

/// Handle validating admission review for TesseraDB
pub async fn validate_handler(
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    review_validation(body).map(Json)
}

/// Answer a mutating review with the defaulting patch
pub fn review_mutation(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionReview<DynamicObject>, WebhookError> {
    let request = into_request(review)?;
    let response = match mutate(&request) {
        Ok(response) => response,
        Err(e) => deny(&request, e)?,
    };
    Ok(response.into_review())
}

/// Answer a validating review with the verdict of the rule set
pub fn review_validation(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionReview<DynamicObject>, WebhookError> {
    let request = into_request(review)?;
    let response = match check(&request) {
        Ok(response) => response,
        Err(e) => deny(&request, e)?,
    };
    Ok(response.into_review())
}

fn into_request(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionRequest<DynamicObject>, WebhookError> {
    review.try_into().map_err(|e: kube::core::admission::ConvertAdmissionReviewError| {
        WebhookError::InvalidReview(e.to_string())
    })
}

/// Deny the request when the submitted object is at fault; anything else
/// fails the review so the API server applies its failure policy
fn deny(
    request: &AdmissionRequest<DynamicObject>,
    err: Error,
) -> Result<AdmissionResponse, WebhookError> {
    if !err.is_user_error() {
        error!(uid = %request.uid, name = %request.name, error = %err, "admission failed");
        return Err(err.into());
    }
    info!(
        uid = %request.uid,
        name = %request.name,
        field = err.field().unwrap_or_default(),
        error = %err,
        "denying TesseraDB"
    );
    Ok(AdmissionResponse::from(request).deny(err.to_string()))
}

fn mutate(request: &AdmissionRequest<DynamicObject>) -> tessera_common::Result<AdmissionResponse> {
    let response = AdmissionResponse::from(request);
    let Some(object) = request.object.as_ref() else {
        debug!(uid = %request.uid, "no object in request, allowing unchanged");
        return Ok(response);
    };

    let original = serde_json::to_value(object)?;
    let db = decode(original.clone())?;
    let spec = serde_json::to_value(&defaulted(&db).spec)?;

    let mut target = original.clone();
    if let Some(fields) = target.as_object_mut() {
        fields.insert("spec".to_string(), spec);
    }
    let patch = json_patch::diff(&original, &target);
    if patch.0.is_empty() {
        debug!(uid = %request.uid, name = %request.name, "already defaulted");
        return Ok(response);
    }

    info!(
        uid = %request.uid,
        name = %request.name,
        patch_ops = patch.0.len(),
        "defaulting TesseraDB"
    );
    response
        .with_patch(patch)
        .map_err(|e| Error::internal_with_context("patch", e.to_string()))
}

fn check(request: &AdmissionRequest<DynamicObject>) -> tessera_common::Result<AdmissionResponse> {
    let response = AdmissionResponse::from(request);
    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return Ok(response);
    }
    let Some(object) = request.object.as_ref() else {
        return Err(Error::validation_for(
            &request.name,
            format!("{:?} request carries no object", request.operation),
        ));
    };

    let new = decode(serde_json::to_value(object)?)?;
    let old = match (&request.operation, request.old_object.as_ref()) {
        (Operation::Update, Some(old)) => Some(decode(serde_json::to_value(old)?)?),
        _ => None,
    };

    validate(old.as_ref(), &new).into_result(&request.name)?;
    Ok(response)
}

fn decode(value: serde_json::Value) -> tessera_common::Result<TesseraDB> {
    serde_json::from_value(value)
        .map_err(|e| Error::serialization_for_kind("TesseraDB", e.to_string()))
}
