use machine_learning::MlErr;
use rayon::prelude::*;

/// The amount of parameters reduced together by a single task.
const CHUNK: usize = 4096;

/// Averages the replicas' gradients into `out`, the all-reduce of a synchronous step.
///
/// # Arguments
/// * `grads` - One gradient per replica.
/// * `out` - Where the mean gradient gets written.
///
/// # Returns
/// An error if any gradient's length doesn't match `out`.
pub fn all_reduce_mean<G>(grads: &[G], out: &mut [f32]) -> Result<(), MlErr>
where
    G: AsRef<[f32]> + Sync,
{
    if let Some(grad) = grads.iter().find(|grad| grad.as_ref().len() != out.len()) {
        return Err(MlErr::SizeMismatch {
            what: "replica gradients",
            got: grad.as_ref().len(),
            expected: out.len(),
        });
    }

    let scale = 1. / grads.len().max(1) as f32;

    out.par_chunks_mut(CHUNK)
        .enumerate()
        .for_each(|(i, out_chunk)| {
            let offset = i * CHUNK;
            out_chunk.fill(0.);

            for grad in grads {
                let grad = &grad.as_ref()[offset..offset + out_chunk.len()];
                out_chunk.iter_mut().zip(grad).for_each(|(o, g)| *o += g);
            }

            out_chunk.iter_mut().for_each(|o| *o *= scale);
        });

    Ok(())
}
