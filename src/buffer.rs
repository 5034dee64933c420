//! Flattening of tuple arrays into backend buffers.

use crate::backend::{Backend, BufferData, BufferHandle, BufferTarget, BufferUsage, ElementType};
use crate::error::{Error, Result};
use crate::math::Vec3;

/// Number of tuples flattened per pass. Bounds the transient reservation when
/// compiling very large meshes.
pub const FLATTEN_CHUNK: usize = 16 * 1024;

/// Element type of a flattened buffer.
pub trait Scalar: Copy {
    fn as_buffer_data(data: &[Self]) -> BufferData<'_>;
}

impl Scalar for f32 {
    fn as_buffer_data(data: &[f32]) -> BufferData<'_> {
        BufferData::Float32(data)
    }
}

impl Scalar for u32 {
    fn as_buffer_data(data: &[u32]) -> BufferData<'_> {
        BufferData::Uint32(data)
    }
}

/// A fixed- or variable-arity tuple that can be appended to a flat array.
pub trait Tuple {
    type Scalar: Scalar;

    fn append_to(&self, out: &mut Vec<Self::Scalar>);
}

impl Tuple for Vec3 {
    type Scalar = f32;

    fn append_to(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&[self.x, self.y, self.z]);
    }
}

impl<S: Scalar, const N: usize> Tuple for [S; N] {
    type Scalar = S;

    fn append_to(&self, out: &mut Vec<S>) {
        out.extend_from_slice(self);
    }
}

impl<S: Scalar> Tuple for Vec<S> {
    type Scalar = S;

    fn append_to(&self, out: &mut Vec<S>) {
        out.extend_from_slice(self);
    }
}

/// A backend buffer holding one flattened tuple array.
#[derive(Debug, Clone)]
pub struct GeometryBuffer {
    handle: BufferHandle,
    target: BufferTarget,
    element_type: Option<ElementType>,
    spacing: usize,
    length: usize,
}

impl GeometryBuffer {
    /// Allocates an empty backend buffer.
    pub fn new<B: Backend + ?Sized>(backend: &mut B, target: BufferTarget) -> Result<Self> {
        Ok(Self {
            handle: backend.create_buffer(target)?,
            target,
            element_type: None,
            spacing: 0,
            length: 0,
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Element type of the last upload, `None` before the first compile.
    pub fn element_type(&self) -> Option<ElementType> {
        self.element_type
    }

    /// Scalars per tuple.
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    /// Total number of scalars.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of tuples.
    pub fn count(&self) -> usize {
        if self.spacing == 0 {
            0
        } else {
            self.length / self.spacing
        }
    }

    /// Flattens `data` and uploads it, replacing the previous contents.
    ///
    /// # Errors
    /// [`Error::InvalidGeometry`] if the tuples do not all share one arity.
    /// The backend buffer is left untouched in that case.
    pub fn compile<B, T>(&mut self, backend: &mut B, data: &[T], usage: BufferUsage) -> Result<()>
    where
        B: Backend + ?Sized,
        T: Tuple,
    {
        let flat = flatten(data)?;
        self.upload(backend, &flat, usage)
    }

    /// Uploads an already flattened array, replacing the previous contents.
    pub fn upload<B, S>(&mut self, backend: &mut B, flat: &Flattened<S>, usage: BufferUsage) -> Result<()>
    where
        B: Backend + ?Sized,
        S: Scalar,
    {
        let payload = S::as_buffer_data(&flat.data);
        backend.upload_buffer(self.handle, payload, usage)?;
        log::debug!(
            "uploaded {:?} buffer {:?}: {} tuples x {}",
            self.target,
            self.handle,
            flat.count(),
            flat.spacing
        );

        self.element_type = Some(payload.element_type());
        self.spacing = flat.spacing;
        self.length = flat.data.len();
        Ok(())
    }
}

/// A tuple array flattened into one scalar array, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened<S> {
    data: Vec<S>,
    spacing: usize,
}

impl<S> Flattened<S> {
    pub fn data(&self) -> &[S] {
        &self.data
    }

    /// Scalars per tuple, 0 for an empty array.
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    pub fn count(&self) -> usize {
        if self.spacing == 0 {
            0
        } else {
            self.data.len() / self.spacing
        }
    }
}

/// Flattens `data` in chunks of [`FLATTEN_CHUNK`] tuples.
///
/// # Errors
/// [`Error::InvalidGeometry`] if the tuples do not all share one arity.
pub fn flatten<T: Tuple>(data: &[T]) -> Result<Flattened<T::Scalar>> {
    let mut flat: Vec<T::Scalar> = Vec::new();
    let mut arity: Option<usize> = None;

    for (chunk_index, chunk) in data.chunks(FLATTEN_CHUNK).enumerate() {
        flat.reserve(chunk.len() * arity.unwrap_or(1));
        for (offset, tuple) in chunk.iter().enumerate() {
            let before = flat.len();
            tuple.append_to(&mut flat);
            let width = flat.len() - before;
            match arity {
                None => arity = Some(width),
                Some(expected) if expected != width => {
                    return Err(Error::InvalidGeometry(format!(
                        "tuple {} has {width} components, expected {expected}",
                        chunk_index * FLATTEN_CHUNK + offset
                    )));
                }
                Some(_) => {}
            }
        }
    }

    let spacing = if data.is_empty() {
        0
    } else {
        if flat.len() % data.len() != 0 {
            return Err(Error::InvalidGeometry(format!(
                "{} scalars do not divide evenly into {} tuples",
                flat.len(),
                data.len()
            )));
        }
        flat.len() / data.len()
    };

    Ok(Flattened {
        data: flat,
        spacing,
    })
}
