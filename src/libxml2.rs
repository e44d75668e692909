//! Safe wrapper around the libxml2 XML Schema FFI.
//!
//! libxml2 is the validation engine proper: schema grammar parsing,
//! content-model matching, and datatype checking all happen behind
//! `xmlSchemaParse` and `xmlSchemaValidateFile`. This module only wraps
//! those calls with RAII resource management and converts libxml2's
//! structured errors into [`ValidationEvent`]s carrying file, line, and
//! column.
//!
//! Thread-safety notes (per <http://xmlsoft.org/threads.html>): parsed
//! schema structures are safe for concurrent read-only use, which is why
//! [`XmlSchemaPtr`] is `Send + Sync`; schema parsing itself is not
//! thread-safe and happens once, up front, on one thread.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_uint, c_void};

use crate::error::{LibXml2Error, LibXml2Result};
use crate::event::{Severity, ValidationEvent};

/// libxml2's parser and global state must be initialized exactly once;
/// the initialization functions themselves are not thread-safe.
static LIBXML2_INIT: Once = Once::new();

/// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

/// Mirror of libxml2's xmlError. `line` is 1-based; `int2` carries the
/// column for parser and validator errors.
#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

/// xmlErrorLevel value for warnings; higher levels are errors.
const XML_ERR_WARNING: c_int = 1;

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Schema parsing
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;

    // Plain document parsing (well-formedness checks)
    pub fn xmlReadFile(url: *const c_char, encoding: *const c_char, options: c_int) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);
}

/// Collects events raised through a structured error callback.
struct EventCapture {
    /// Used when libxml2 reports no file, e.g. for in-memory parses.
    fallback_source: String,
    events: Vec<ValidationEvent>,
}

impl EventCapture {
    fn new(fallback_source: String) -> Self {
        Self {
            fallback_source,
            events: Vec::new(),
        }
    }

    fn as_user_data(&mut self) -> *mut c_void {
        self as *mut EventCapture as *mut c_void
    }
}

/// Structured error callback registered with parser and validation
/// contexts. user_data is the EventCapture owned by the calling wrapper
/// method; it outlives the context the callback is registered on.
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }

    let capture = unsafe { &mut *(user_data as *mut EventCapture) };
    let err = unsafe { &*error };

    let message = if err.message.is_null() {
        String::from("unknown libxml2 error")
    } else {
        unsafe { CStr::from_ptr(err.message) }
            .to_string_lossy()
            .trim()
            .to_string()
    };

    let source = if err.file.is_null() {
        capture.fallback_source.clone()
    } else {
        unsafe { CStr::from_ptr(err.file) }
            .to_string_lossy()
            .into_owned()
    };

    let severity = if err.level == XML_ERR_WARNING {
        Severity::Warning
    } else {
        Severity::Error
    };

    capture.events.push(ValidationEvent {
        severity,
        source,
        line: err.line.max(0) as u32,
        column: err.int2.max(0) as u32,
        message,
    });
}

/// Thread-safe, reference-counted owner of a parsed libxml2 schema.
///
/// The underlying pointer is freed with `xmlSchemaFree` when the last
/// clone is dropped.
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 schema structures are read-only after parsing and
// documented thread-safe for validation use.
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// Take ownership of a raw schema pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `xmlSchemaParse` and must not be
    /// freed by anyone else.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }

        Some(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        // The Arc guarantees this runs exactly once per parsed schema.
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Result of one schema parse: the schema (when usable) plus every event
/// libxml2 raised along the way.
#[derive(Debug)]
pub struct SchemaParseOutcome {
    pub schema: Option<XmlSchemaPtr>,
    pub events: Vec<ValidationEvent>,
}

/// Return-code classification from `xmlSchemaValidateFile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// Return code 0
    Valid,
    /// Return code > 0
    Invalid { error_count: i32 },
    /// Return code < 0
    InternalError { code: i32 },
}

impl ValidationVerdict {
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => ValidationVerdict::Valid,
            n if n > 0 => ValidationVerdict::Invalid { error_count: n },
            n => ValidationVerdict::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationVerdict::Valid)
    }
}

/// Result of validating one document: the verdict plus every captured
/// event (well-formedness and schema violations both arrive here).
#[derive(Debug)]
pub struct ValidateOutcome {
    pub verdict: ValidationVerdict,
    pub events: Vec<ValidationEvent>,
}

/// Safe entry points into libxml2 schema parsing and validation.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Safe to call any number of times; libxml2 initialization happens
    /// exactly once.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse one XSD file. Schema documents are read as plain XML; DTD
    /// subsets inside them are not resolved or fetched, so a schema file
    /// cannot trigger external entity expansion.
    ///
    /// Parse diagnostics come back as events; a `None` schema with no
    /// error event means libxml2 failed without saying why.
    pub fn parse_schema_file(&self, path: &Path) -> LibXml2Result<SchemaParseOutcome> {
        let c_path = path_to_cstring(path)?;
        let mut capture = EventCapture::new(path.display().to_string());

        unsafe {
            let ctxt = xmlSchemaNewParserCtxt(c_path.as_ptr());
            if ctxt.is_null() {
                return Err(LibXml2Error::ParserContextFailed);
            }

            xmlSchemaSetParserStructuredErrors(
                ctxt,
                Some(structured_error_callback),
                capture.as_user_data(),
            );

            let schema_ptr = xmlSchemaParse(ctxt);
            xmlSchemaFreeParserCtxt(ctxt);

            Ok(SchemaParseOutcome {
                schema: XmlSchemaPtr::from_raw(schema_ptr),
                events: capture.events,
            })
        }
    }

    /// Parse a schema held in memory. `source_label` names the buffer in
    /// events libxml2 cannot attribute to a file.
    pub fn parse_schema_from_memory(
        &self,
        schema_data: &[u8],
        source_label: &str,
    ) -> LibXml2Result<SchemaParseOutcome> {
        let mut capture = EventCapture::new(source_label.to_string());

        unsafe {
            let ctxt = xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );
            if ctxt.is_null() {
                return Err(LibXml2Error::ParserContextFailed);
            }

            xmlSchemaSetParserStructuredErrors(
                ctxt,
                Some(structured_error_callback),
                capture.as_user_data(),
            );

            let schema_ptr = xmlSchemaParse(ctxt);
            xmlSchemaFreeParserCtxt(ctxt);

            Ok(SchemaParseOutcome {
                schema: XmlSchemaPtr::from_raw(schema_ptr),
                events: capture.events,
            })
        }
    }

    /// Validate one document file against a parsed schema, draining the
    /// whole document so every event is raised, not merely the first.
    /// Well-formedness failures and schema violations both surface through
    /// the captured events.
    pub fn validate_file(
        &self,
        schema: &XmlSchemaPtr,
        file_path: &Path,
    ) -> LibXml2Result<ValidateOutcome> {
        let c_path = path_to_cstring(file_path)?;
        let mut capture = EventCapture::new(file_path.display().to_string());

        unsafe {
            // A validation context is cheap and single-use; one per parse.
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                capture.as_user_data(),
            );

            let code = xmlSchemaValidateFile(valid_ctxt, c_path.as_ptr(), 0);
            xmlSchemaFreeValidCtxt(valid_ctxt);

            Ok(ValidateOutcome {
                verdict: ValidationVerdict::from_code(code),
                events: capture.events,
            })
        }
    }

    /// Parse one document for well-formedness only, without any schema.
    /// Used when the schema set is empty: malformed XML is still surfaced
    /// while no schema constraints apply.
    ///
    /// Captures diagnostics through the process-wide structured error
    /// handler for the duration of the parse; callers are expected to be
    /// single-threaded through the batch loop.
    pub fn check_well_formed(&self, file_path: &Path) -> LibXml2Result<ValidateOutcome> {
        let c_path = path_to_cstring(file_path)?;
        let mut capture = EventCapture::new(file_path.display().to_string());

        unsafe {
            xmlSetStructuredErrorFunc(capture.as_user_data(), Some(structured_error_callback));
            let doc = xmlReadFile(c_path.as_ptr(), std::ptr::null(), 0);
            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);

            let verdict = if doc.is_null() {
                let error_count = capture.events.iter().filter(|e| e.is_error()).count();
                ValidationVerdict::Invalid {
                    error_count: error_count.max(1) as i32,
                }
            } else {
                xmlFreeDoc(doc);
                ValidationVerdict::Valid
            };

            Ok(ValidateOutcome {
                verdict,
                events: capture.events,
            })
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

fn path_to_cstring(path: &Path) -> LibXml2Result<CString> {
    let path_str = path.to_str().ok_or_else(|| LibXml2Error::BadPath {
        file: path.to_path_buf(),
    })?;

    CString::new(path_str).map_err(|_| LibXml2Error::BadPath {
        file: path.to_path_buf(),
    })
}
