//! Entry encoding and batch operation lists.
//!
//! An *entry* names a stored object as `bucket:key` (or just `bucket`). Every
//! per-object path segment carries the entry in URL-safe base64 without
//! padding. Batch op lists keep the caller's order: the service answers
//! positionally, one result per op.

use crate::util::encode::urlsafe_base64;

/// Builds the entry string for `bucket` and an optional `key`.
pub fn entry(bucket: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => format!("{bucket}:{key}"),
        None => bucket.to_string(),
    }
}

/// Encodes an entry string for use in a request path.
pub fn encode_entry(entry: &str) -> String {
    urlsafe_base64(entry)
}

/// Shorthand for `encode_entry(&entry(bucket, key))`.
pub fn encoded_entry(bucket: &str, key: Option<&str>) -> String {
    encode_entry(&entry(bucket, key))
}

/// Builds `<verb>/<entry>` ops for one-key verbs such as `delete` and `stat`.
pub fn build_one_key_batch<I, S>(verb: &str, bucket: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keys.into_iter()
        .map(|key| format!("{verb}/{}", encoded_entry(bucket, Some(key.as_ref()))))
        .collect()
}

/// Builds `<verb>/<from>/<to>` ops for two-key verbs such as `copy` and
/// `move`. Pairs are `(from_key, to_key)`; `target_bucket` defaults to
/// `source_bucket`.
pub fn build_two_key_batch<I, K, V>(
    verb: &str,
    source_bucket: &str,
    key_pairs: I,
    target_bucket: Option<&str>,
) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let target_bucket = target_bucket.unwrap_or(source_bucket);
    key_pairs
        .into_iter()
        .map(|(from, to)| {
            format!(
                "{verb}/{}/{}",
                encoded_entry(source_bucket, Some(from.as_ref())),
                encoded_entry(target_bucket, Some(to.as_ref()))
            )
        })
        .collect()
}

pub fn build_batch_delete<I, S>(bucket: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    build_one_key_batch("delete", bucket, keys)
}

pub fn build_batch_stat<I, S>(bucket: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    build_one_key_batch("stat", bucket, keys)
}

pub fn build_batch_copy<I, K, V>(
    source_bucket: &str,
    key_pairs: I,
    target_bucket: Option<&str>,
) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    build_two_key_batch("copy", source_bucket, key_pairs, target_bucket)
}

pub fn build_batch_move<I, K, V>(
    source_bucket: &str,
    key_pairs: I,
    target_bucket: Option<&str>,
) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    build_two_key_batch("move", source_bucket, key_pairs, target_bucket)
}

/// Renames within one bucket, a move whose target is the source bucket.
pub fn build_batch_rename<I, K, V>(bucket: &str, key_pairs: I) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    build_batch_move(bucket, key_pairs, Some(bucket))
}

/// Joins ops into the `op=<a>&op=<b>` batch request body, in order.
pub fn batch_body<S: AsRef<str>>(ops: &[S]) -> String {
    let mut out = String::new();
    for (idx, op) in ops.iter().enumerate() {
        if idx > 0 {
            out.push('&');
        }
        out.push_str("op=");
        out.push_str(op.as_ref());
    }
    out
}
