use std::collections::BTreeMap;
use url::Url;

/// Source of query parameters appended to every connection URL of a run.
///
/// The connection index is passed as context; providers are free to ignore it.
pub trait ConnectionParams: Send + Sync {
    fn params(&self, index: usize) -> Vec<(String, String)>;
}

impl<F> ConnectionParams for F
where
    F: Fn(usize) -> Vec<(String, String)> + Send + Sync,
{
    fn params(&self, index: usize) -> Vec<(String, String)> {
        self(index)
    }
}

impl ConnectionParams for BTreeMap<String, String> {
    fn params(&self, _index: usize) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

pub(crate) fn connection_url(
    base: &Url,
    params: Option<&dyn ConnectionParams>,
    index: usize,
) -> Url {
    let mut url = base.clone();
    if let Some(params) = params {
        let pairs = params.params(index);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }
    url
}
