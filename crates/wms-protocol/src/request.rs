//! Dispatch of an incoming WMS request to its operation.

use tracing::{debug, instrument};

use ows_common::exception::{missing_parameter_value, missing_request_body, operation_not_supported};
use ows_common::xml::read_root_element;
use ows_common::{ExceptionReport, Exceptions, OperationRequest, OwsResult, QueryValues};

use crate::base::empty_query;
use crate::capabilities::WmsCapabilities;
use crate::exceptions::WmsExceptionReport;
use crate::getcapabilities::GetCapabilities;
use crate::getfeatureinfo::GetFeatureInfo;
use crate::getmap::GetMap;
use crate::{GETCAPABILITIES, GETFEATUREINFO, GETMAP, REQUEST};

/// WMS request types.
#[derive(Debug, Clone, PartialEq)]
pub enum WmsRequest {
    GetCapabilities(GetCapabilities),
    GetMap(GetMap),
    GetFeatureInfo(GetFeatureInfo),
}

impl WmsRequest {
    /// Parse, then validate, rendering any failure as a ServiceExceptionReport.
    pub fn handle_kvp(
        query: &QueryValues,
        capabilities: &(dyn WmsCapabilities + 'static),
    ) -> Result<Self, Vec<u8>> {
        let request = Self::parse_kvp(query).map_err(|e| WmsExceptionReport.report(e.as_slice()))?;
        let exceptions = request.validate(capabilities);
        if exceptions.is_empty() {
            Ok(request)
        } else {
            Err(WmsExceptionReport.report(exceptions.as_slice()))
        }
    }
}

impl OperationRequest for WmsRequest {
    type Capabilities = dyn WmsCapabilities;

    fn request_type(&self) -> &'static str {
        match self {
            Self::GetCapabilities(r) => r.request_type(),
            Self::GetMap(r) => r.request_type(),
            Self::GetFeatureInfo(r) => r.request_type(),
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
        debug!(operation, "dispatching WMS KVP request");

        if operation.eq_ignore_ascii_case(GETCAPABILITIES) {
            GetCapabilities::parse_kvp(query).map(Self::GetCapabilities)
        } else if operation.eq_ignore_ascii_case(GETMAP) {
            GetMap::parse_kvp(query).map(Self::GetMap)
        } else if operation.eq_ignore_ascii_case(GETFEATUREINFO) {
            GetFeatureInfo::parse_kvp(query).map(Self::GetFeatureInfo)
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
        debug!(operation = %root.name, "dispatching WMS XML request");

        match root.name.as_str() {
            GETCAPABILITIES => GetCapabilities::parse_xml(body).map(Self::GetCapabilities),
            GETMAP => GetMap::parse_xml(body).map(Self::GetMap),
            GETFEATUREINFO => GetFeatureInfo::parse_xml(body).map(Self::GetFeatureInfo),
            other => Err(operation_not_supported(other).into()),
        }
    }

    fn build_kvp(&self) -> QueryValues {
        match self {
            Self::GetCapabilities(r) => r.build_kvp(),
            Self::GetMap(r) => r.build_kvp(),
            Self::GetFeatureInfo(r) => r.build_kvp(),
        }
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        match self {
            Self::GetCapabilities(r) => r.build_xml(),
            Self::GetMap(r) => r.build_xml(),
            Self::GetFeatureInfo(r) => r.build_xml(),
        }
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        match self {
            Self::GetCapabilities(r) => r.validate(capabilities),
            Self::GetMap(r) => r.validate(capabilities),
            Self::GetFeatureInfo(r) => r.validate(capabilities),
        }
    }
}

impl From<GetCapabilities> for WmsRequest {
    fn from(request: GetCapabilities) -> Self {
        Self::GetCapabilities(request)
    }
}

impl From<GetMap> for WmsRequest {
    fn from(request: GetMap) -> Self {
        Self::GetMap(request)
    }
}

impl From<GetFeatureInfo> for WmsRequest {
    fn from(request: GetFeatureInfo) -> Self {
        Self::GetFeatureInfo(request)
    }
}
