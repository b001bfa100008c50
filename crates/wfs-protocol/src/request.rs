//! Dispatch of an incoming WFS request to its operation.

use tracing::{debug, instrument};

use ows_common::exception::{missing_parameter_value, missing_request_body, operation_not_supported};
use ows_common::xml::read_root_element;
use ows_common::{ExceptionReport, Exceptions, OperationRequest, OwsResult, QueryValues};

use crate::base::empty_query;
use crate::capabilities::WfsCapabilities;
use crate::describefeaturetype::DescribeFeatureType;
use crate::exceptions::WfsExceptionReport;
use crate::getcapabilities::GetCapabilities;
use crate::getfeature::GetFeature;
use crate::{DESCRIBEFEATURETYPE, GETCAPABILITIES, GETFEATURE, REQUEST};

/// WFS request types.
#[derive(Debug, Clone, PartialEq)]
pub enum WfsRequest {
    GetCapabilities(GetCapabilities),
    DescribeFeatureType(DescribeFeatureType),
    GetFeature(GetFeature),
}

impl WfsRequest {
    /// Parse, then validate, rendering any failure as an ExceptionReport.
    pub fn handle_kvp(
        query: &QueryValues,
        capabilities: &(dyn WfsCapabilities + 'static),
    ) -> Result<Self, Vec<u8>> {
        let request = Self::parse_kvp(query).map_err(|e| WfsExceptionReport.report(e.as_slice()))?;
        let exceptions = request.validate(capabilities);
        if exceptions.is_empty() {
            Ok(request)
        } else {
            Err(WfsExceptionReport.report(exceptions.as_slice()))
        }
    }
}

impl OperationRequest for WfsRequest {
    type Capabilities = dyn WfsCapabilities;

    fn request_type(&self) -> &'static str {
        match self {
            Self::GetCapabilities(r) => r.request_type(),
            Self::DescribeFeatureType(r) => r.request_type(),
            Self::GetFeature(r) => r.request_type(),
        }
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        if query.is_empty() {
            return Err(empty_query());
        }
        let operation = query
            .first_ignore_case(REQUEST)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Exceptions::from(missing_parameter_value(REQUEST)))?;
        debug!(operation, "dispatching WFS KVP request");

        if operation.eq_ignore_ascii_case(GETCAPABILITIES) {
            GetCapabilities::parse_kvp(query).map(Self::GetCapabilities)
        } else if operation.eq_ignore_ascii_case(DESCRIBEFEATURETYPE) {
            DescribeFeatureType::parse_kvp(query).map(Self::DescribeFeatureType)
        } else if operation.eq_ignore_ascii_case(GETFEATURE) {
            GetFeature::parse_kvp(query).map(Self::GetFeature)
        } else {
            Err(operation_not_supported(operation).into())
        }
    }

    #[instrument(skip_all)]
    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions> {
        let root = read_root_element(body).map_err(|err| {
            debug!(error = %err, "request body has no readable root element");
            Exceptions::from(missing_request_body())
        })?;
        debug!(operation = %root.name, "dispatching WFS XML request");

        match root.name.as_str() {
            GETCAPABILITIES => GetCapabilities::parse_xml(body).map(Self::GetCapabilities),
            DESCRIBEFEATURETYPE => {
                DescribeFeatureType::parse_xml(body).map(Self::DescribeFeatureType)
            }
            GETFEATURE => GetFeature::parse_xml(body).map(Self::GetFeature),
            other => Err(operation_not_supported(other).into()),
        }
    }

    fn build_kvp(&self) -> QueryValues {
        match self {
            Self::GetCapabilities(r) => r.build_kvp(),
            Self::DescribeFeatureType(r) => r.build_kvp(),
            Self::GetFeature(r) => r.build_kvp(),
        }
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        match self {
            Self::GetCapabilities(r) => r.build_xml(),
            Self::DescribeFeatureType(r) => r.build_xml(),
            Self::GetFeature(r) => r.build_xml(),
        }
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        match self {
            Self::GetCapabilities(r) => r.validate(capabilities),
            Self::DescribeFeatureType(r) => r.validate(capabilities),
            Self::GetFeature(r) => r.validate(capabilities),
        }
    }
}

impl From<GetCapabilities> for WfsRequest {
    fn from(request: GetCapabilities) -> Self {
        Self::GetCapabilities(request)
    }
}

impl From<DescribeFeatureType> for WfsRequest {
    fn from(request: DescribeFeatureType) -> Self {
        Self::DescribeFeatureType(request)
    }
}

impl From<GetFeature> for WfsRequest {
    fn from(request: GetFeature) -> Self {
        Self::GetFeature(request)
    }
}
