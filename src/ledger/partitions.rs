/// Key layout for Fjall partitions
///
/// Partition structure:
/// - `results`: result:{len}:{task_kind}:{len}:{document_id}:{task_id} -> ResultRecord (JSON)
/// - `tasks`: task:{task_id} -> result key
///
/// Kind and document id are length-prefixed: ids are opaque and may contain
/// the `:` separator themselves.

/// Encode a result key: result:{len}:{task_kind}:{len}:{document_id}:{task_id}
pub fn encode_result_key(task_kind: &str, document_id: &str, task_id: &str) -> Vec<u8> {
    let mut key = encode_result_prefix(task_kind, document_id);
    key.extend_from_slice(task_id.as_bytes());
    key
}

/// Encode a result prefix for range scan: result:{len}:{task_kind}:{len}:{document_id}:
pub fn encode_result_prefix(task_kind: &str, document_id: &str) -> Vec<u8> {
    format!("result:{}:{}:", segment(task_kind), segment(document_id)).into_bytes()
}

/// Encode a task key: task:{task_id}
pub fn encode_task_key(task_id: &str) -> Vec<u8> {
    format!("task:{}", task_id).into_bytes()
}

fn segment(value: &str) -> String {
    format!("{}:{}", value.len(), value)
}
