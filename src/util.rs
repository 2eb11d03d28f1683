use base64::prelude::*;

pub(crate) fn base64url<T: ?Sized + AsRef<[u8]>>(input: &T) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64url_decode<T: ?Sized + AsRef<[u8]>>(input: &T) -> Option<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD.decode(input).ok()
}
