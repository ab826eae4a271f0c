use crate::core::endpoint::EndpointDescriptor;
use crate::domain::model::{
    FailureKind, InputRecord, LookupKey, VerificationResult, MSG_SERIAL_MISSING,
};

/// Builds the lookup key for a row, or the short-circuit result when a
/// required value is blank. Optional inputs join the key only when present.
pub fn extract_lookup_key(
    record: &InputRecord,
    descriptor: &EndpointDescriptor,
) -> std::result::Result<LookupKey, VerificationResult> {
    if record.serial.is_empty() {
        return Err(VerificationResult::failed(
            FailureKind::InputMissing,
            MSG_SERIAL_MISSING,
        ));
    }

    let mut values = Vec::with_capacity(descriptor.inputs.len());
    for field in &descriptor.inputs {
        let value = record.value(&field.column).trim();
        if value.is_empty() {
            return Err(VerificationResult::failed(
                FailureKind::InputMissing,
                format!("{} is missing.", field.label()),
            ));
        }
        values.push((field.column.clone(), value.to_string()));
    }

    for column in &descriptor.optional_inputs {
        let value = record.value(column).trim();
        if !value.is_empty() {
            values.push((column.clone(), value.to_string()));
        }
    }

    Ok(LookupKey { values })
}
