//! Helper impls for the generated wire types
//!
//! The generated structs are plain data; the impls here carry the small
//! amount of behavior the routing core needs: document identity for
//! partitioning, hop accounting, and conversion between the request shape
//! (leaf-module contract) and the stream envelope (engine contract).

use crate::{PipeStream, ProcessRequest, ProcessResponse, ServiceMetadata};

impl PipeStream {
    /// Get the document id carried by this stream, if the document is
    /// present and its id is non-blank.
    pub fn document_id(&self) -> Option<&str> {
        self.document
            .as_ref()
            .map(|d| d.id.as_str())
            .filter(|id| !id.trim().is_empty())
    }

    /// Re-target this stream at a downstream step, advancing the hop counter.
    #[must_use]
    pub fn for_target(mut self, target_step_name: impl Into<String>) -> Self {
        self.target_step_name = target_step_name.into();
        self.current_hop_number += 1;
        self
    }

    /// Convert the stream envelope into the leaf-module request shape.
    ///
    /// Used when a stream hop terminates at a module that only speaks the
    /// `ProcessData` contract.
    pub fn into_request(self) -> ProcessRequest {
        ProcessRequest {
            document: self.document,
            metadata: Some(ServiceMetadata {
                pipeline_name: self.current_pipeline_name,
                pipe_step_name: self.target_step_name,
                stream_id: self.stream_id,
                current_hop_number: self.current_hop_number,
                context_params: self.context_params,
            }),
            config: None,
        }
    }
}

impl ProcessRequest {
    /// Wrap this request's document and metadata into a stream envelope.
    ///
    /// Used when the target of a request turns out to be another engine:
    /// the engine contract takes one stream hop, not a bare request.
    pub fn into_stream_envelope(self) -> PipeStream {
        let metadata = self.metadata.unwrap_or_default();
        PipeStream {
            stream_id: metadata.stream_id,
            document: self.document,
            current_pipeline_name: metadata.pipeline_name,
            target_step_name: metadata.pipe_step_name,
            current_hop_number: metadata.current_hop_number,
            context_params: metadata.context_params,
        }
    }
}

impl ProcessResponse {
    /// Build a success response carrying the processed document.
    pub fn ok(output_doc: Option<crate::PipeDoc>) -> Self {
        Self {
            success: true,
            output_doc,
            processor_logs: Vec::new(),
            error_details: String::new(),
        }
    }

    /// Build a failure response with an error description.
    pub fn failure(error_details: impl Into<String>) -> Self {
        Self {
            success: false,
            output_doc: None,
            processor_logs: Vec::new(),
            error_details: error_details.into(),
        }
    }
}
