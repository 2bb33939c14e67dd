//! Python bindings for http-acl.

use std::net::IpAddr;

use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyModule;

use crate::config::{self, PolicyConfig};
use crate::{Classification, ConnectTarget, Decision, Error, Policy};

// Custom exception types
pyo3::create_exception!(http_acl, AclError, PyException);
pyo3::create_exception!(http_acl, AclDenied, AclError);
pyo3::create_exception!(http_acl, InvalidUrl, AclError);
pyo3::create_exception!(http_acl, InvalidConfig, AclError);
pyo3::create_exception!(http_acl, NoAddresses, AclError);

/// Classification enum for Python.
#[pyclass(name = "Classification", eq, eq_int)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PyClassification {
    AllowedUserAcl,
    AllowedDefault,
    DeniedUserAcl,
    DeniedDefault,
    DeniedPrivateRange,
}

impl From<Classification> for PyClassification {
    fn from(c: Classification) -> Self {
        match c {
            Classification::AllowedUserAcl => PyClassification::AllowedUserAcl,
            Classification::AllowedDefault => PyClassification::AllowedDefault,
            Classification::DeniedUserAcl => PyClassification::DeniedUserAcl,
            Classification::DeniedDefault => PyClassification::DeniedDefault,
            Classification::DeniedPrivateRange => PyClassification::DeniedPrivateRange,
        }
    }
}

/// Decision for Python.
#[pyclass(name = "Decision", frozen)]
#[derive(Clone)]
pub struct PyDecision {
    #[pyo3(get)]
    pub classification: PyClassification,
    #[pyo3(get)]
    pub allowed: bool,
    #[pyo3(get)]
    pub details: Option<String>,
    status: &'static str,
}

#[pymethods]
impl PyDecision {
    fn __repr__(&self) -> String {
        match &self.details {
            Some(details) => format!(
                "Decision({}, allowed={}, details={:?})",
                self.status, self.allowed, details
            ),
            None => format!("Decision({}, allowed={})", self.status, self.allowed),
        }
    }
}

impl From<Decision> for PyDecision {
    fn from(d: Decision) -> Self {
        Self {
            classification: d.classification().into(),
            allowed: d.allowed(),
            details: d.details().map(str::to_string),
            status: d.classification().as_str(),
        }
    }
}

/// Policy for Python.
#[pyclass(name = "Acl", frozen)]
pub struct PyAcl {
    inner: Policy,
}

#[pymethods]
impl PyAcl {
    #[new]
    #[pyo3(signature = (
        *,
        allow_http = false,
        allow_https = true,
        allowed_methods = None,
        denied_methods = None,
        method_default_allow = false,
        allowed_ips = None,
        denied_ips = None,
        allow_private_ranges = false,
        ip_default_allow = true,
        extra_private_ranges = None,
        allowed_ports = None,
        denied_ports = None,
        port_default_allow = false,
        allowed_hosts = None,
        denied_hosts = None,
        host_default_allow = true,
        allow_username_in_url = false,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        allow_http: bool,
        allow_https: bool,
        allowed_methods: Option<Vec<String>>,
        denied_methods: Option<Vec<String>>,
        method_default_allow: bool,
        allowed_ips: Option<Vec<String>>,
        denied_ips: Option<Vec<String>>,
        allow_private_ranges: bool,
        ip_default_allow: bool,
        extra_private_ranges: Option<Vec<String>>,
        allowed_ports: Option<Vec<u16>>,
        denied_ports: Option<Vec<u16>>,
        port_default_allow: bool,
        allowed_hosts: Option<Vec<String>>,
        denied_hosts: Option<Vec<String>>,
        host_default_allow: bool,
        allow_username_in_url: bool,
    ) -> PyResult<Self> {
        let defaults = PolicyConfig::default();
        let config = PolicyConfig {
            allow_http,
            allow_https,
            allowed_methods: allowed_methods.unwrap_or(defaults.allowed_methods),
            denied_methods: denied_methods.unwrap_or_default(),
            method_default_allow,
            allowed_ips: parse_ips(allowed_ips)?,
            denied_ips: parse_ips(denied_ips)?,
            allow_private_ranges,
            ip_default_allow,
            extra_private_ranges: extra_private_ranges.unwrap_or_default(),
            allowed_ports: allowed_ports.unwrap_or(defaults.allowed_ports),
            denied_ports: denied_ports.unwrap_or_default(),
            port_default_allow,
            allowed_hosts: allowed_hosts.unwrap_or_default(),
            denied_hosts: denied_hosts.unwrap_or_default(),
            host_default_allow,
            allow_username_in_url,
        };
        let inner = config.into_policy().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[staticmethod]
    fn standard() -> Self {
        Self {
            inner: Policy::standard(),
        }
    }

    #[staticmethod]
    fn from_toml(s: &str) -> PyResult<Self> {
        let inner = config::load_from_str(s).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn is_scheme_allowed(&self, scheme: &str) -> PyDecision {
        self.inner.is_scheme_allowed(scheme).into()
    }

    fn is_method_allowed(&self, method: &str) -> PyResult<PyDecision> {
        let method =
            config::parse_method(method).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(self.inner.is_method_allowed(&method).into())
    }

    fn is_ip_allowed(&self, ip: &str) -> PyResult<PyDecision> {
        let decision = self.inner.is_ip_str_allowed(ip).map_err(to_py_err)?;
        Ok(decision.into())
    }

    fn is_port_allowed(&self, port: u16) -> PyDecision {
        self.inner.is_port_allowed(port).into()
    }

    fn is_host_allowed(&self, host: &str) -> PyDecision {
        self.inner.is_host_allowed(host).into()
    }

    fn is_url_allowed(&self, url: &str) -> PyResult<PyDecision> {
        let decision = self.inner.is_url_allowed(url).map_err(to_py_err)?;
        Ok(decision.into())
    }

    /// Raise `AclDenied` unless every part of the connection passes.
    fn check_connect(
        &self,
        scheme: &str,
        host: &str,
        port: u16,
        addrs: Vec<String>,
    ) -> PyResult<()> {
        let addrs = parse_ips(Some(addrs))?;
        self.inner
            .check_connect(&ConnectTarget::new(scheme, host, port, &addrs))
            .map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}

fn parse_ips(ips: Option<Vec<String>>) -> PyResult<Vec<IpAddr>> {
    ips.unwrap_or_default()
        .iter()
        .map(|ip| {
            ip.parse::<IpAddr>()
                .map_err(|e| PyValueError::new_err(format!("{ip} - {e}")))
        })
        .collect()
}

/// Convert Rust error to Python exception.
fn to_py_err(e: Error) -> PyErr {
    match e {
        Error::InvalidUrl { url, reason } => InvalidUrl::new_err(format!("{} - {}", url, reason)),
        Error::InvalidIp { value, reason } => {
            PyValueError::new_err(format!("{} - {}", value, reason))
        }
        Error::InvalidConfig { reason } => InvalidConfig::new_err(reason),
        Error::NoAddresses { host } => {
            NoAddresses::new_err(format!("No address found for DNS resolution on {}", host))
        }
        denied @ Error::Denied { .. } => AclDenied::new_err(denied.to_string()),
    }
}

/// Register all Python bindings.
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyClassification>()?;
    m.add_class::<PyDecision>()?;
    m.add_class::<PyAcl>()?;

    // Add exception types
    m.add("AclError", m.py().get_type::<AclError>())?;
    m.add("AclDenied", m.py().get_type::<AclDenied>())?;
    m.add("InvalidUrl", m.py().get_type::<InvalidUrl>())?;
    m.add("InvalidConfig", m.py().get_type::<InvalidConfig>())?;
    m.add("NoAddresses", m.py().get_type::<NoAddresses>())?;

    Ok(())
}
