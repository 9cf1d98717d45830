// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Presigns STS `GetCallerIdentity` requests with [AWS Signature Version 4].
//!
//! [AWS Signature Version 4]: https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html

use crate::Result;
use crate::credentials::AwsCredential;
use crate::errors::{Error, ErrorCode};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;

/// RFC 3986 unreserved characters are left as-is, everything else is encoded.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "sts";

/// How long the presigned URL is accepted by STS.
pub(crate) const PRESIGN_EXPIRES: Duration = Duration::from_secs(15 * 60);

/// The header binding the request to a cluster.
pub(crate) const CLUSTER_ID_HEADER: &str = "x-k8s-aws-id";

/// The method used to sign, and to replay, the request.
pub(crate) const METHOD: &str = "POST";

/// The hex-encoded SHA-256 digest of an empty payload.
const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// A presigned `GetCallerIdentity` request.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PresignedRequest {
    pub url: String,
    /// The value of the `Host` header the signature covers.
    pub host: String,
}

/// Presigns a `GetCallerIdentity` request bound to `cluster_name`.
///
/// The result depends only on the inputs, including `now`.
pub(crate) fn presign(
    credential: &AwsCredential,
    region: &str,
    endpoint: &str,
    cluster_name: &str,
    now: DateTime<Utc>,
) -> Result<PresignedRequest> {
    let endpoint_url = url::Url::parse(endpoint).map_err(|e| {
        Error::wrap(ErrorCode::ConfigInvalid, e)
            .with_detail(format!("invalid STS endpoint {endpoint}"))
    })?;
    let host = match (endpoint_url.host_str(), endpoint_url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(Error::new(
                ErrorCode::ConfigInvalid,
                format!("the STS endpoint {endpoint} has no host"),
            ));
        }
    };
    let canonical_uri = match endpoint_url.path() {
        "" => "/",
        path => path,
    };

    let request_timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = now.format("%Y%m%d").to_string();
    let credential_scope = format!("{datestamp}/{region}/{SERVICE}/aws4_request");

    let headers = BTreeMap::from([("host", host.as_str()), (CLUSTER_ID_HEADER, cluster_name)]);
    let canonical_headers = headers
        .iter()
        .fold(String::new(), |acc, (k, v)| format!("{acc}{k}:{}\n", v.trim()));
    let signed_headers = headers.keys().copied().collect::<Vec<_>>().join(";");

    let mut query_parameters = BTreeMap::from([
        ("Action", "GetCallerIdentity".to_string()),
        ("Version", "2011-06-15".to_string()),
        ("X-Amz-Algorithm", ALGORITHM.to_string()),
        (
            "X-Amz-Credential",
            format!("{}/{credential_scope}", credential.access_key_id),
        ),
        ("X-Amz-Date", request_timestamp.clone()),
        ("X-Amz-Expires", PRESIGN_EXPIRES.as_secs().to_string()),
        ("X-Amz-SignedHeaders", signed_headers.clone()),
    ]);
    if !credential.session_token.is_empty() {
        query_parameters.insert("X-Amz-Security-Token", credential.session_token.clone());
    }
    let canonical_query_string = query_parameters
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = [
        METHOD,
        canonical_uri,
        &canonical_query_string,
        &canonical_headers,
        &signed_headers,
        EMPTY_PAYLOAD_HASH,
    ]
    .join("\n");
    let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

    let string_to_sign = [
        ALGORITHM,
        &request_timestamp,
        &credential_scope,
        &canonical_request_hash,
    ]
    .join("\n");

    let signing_key = [region, SERVICE, "aws4_request"].iter().try_fold(
        hmac_sha256(
            format!("AWS4{}", credential.secret_access_key).as_bytes(),
            datestamp.as_bytes(),
        )?,
        |key, part| hmac_sha256(&key, part.as_bytes()),
    )?;
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

    let url = format!(
        "{}://{host}{canonical_uri}?{canonical_query_string}&X-Amz-Signature={signature}",
        endpoint_url.scheme()
    );
    Ok(PresignedRequest { url, host })
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE_SET).to_string()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| Error::new(ErrorCode::TokenGenerationFailed, "invalid HMAC key length"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
