//! Property tests for the access policy and subject ids.
