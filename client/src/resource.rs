use core::fmt;

use url::Url;

use crate::ClientError;

const SEP: char = '/';

/// Remote endpoint address built from a service base URL.
///
/// Path segments are percent-encoded as they are appended so identifiers
/// containing spaces or slashes (project names, model ids) stay one segment.
#[derive(Clone, Debug)]
pub struct Resource {
    url: Url,
}

impl Resource {
    pub fn new(uri: &str) -> Result<Resource, ClientError> {
        let url = Url::parse(uri).map_err(|_| ClientError::InvalidEndpoint(uri.to_owned()))?;
        if url.cannot_be_a_base() {
            return Err(ClientError::InvalidEndpoint(uri.to_owned()));
        }
        Ok(Resource { url })
    }

    /// Appends a `/` separated path. Empty segments are skipped and a trailing
    /// separator is kept.
    pub fn append_path(&mut self, path: &str) -> &mut Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split(SEP).filter(|s| !s.is_empty()));
            if path.ends_with(SEP) {
                segments.push("");
            }
        }
        self
    }

    /// Appends a single segment, encoding any separators inside it.
    pub fn append_segment(&mut self, segment: &str) -> &mut Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        self
    }

    #[must_use]
    pub fn to_url(&self) -> Url {
        self.url.clone()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
