//! JNI bridge between the emulator's Kotlin front-end and the audio engine
//!
//! Exports `com.felipecsl.knes.JniKt.{start,stop,pause,resume}AudioEngine`
//! and implements [`SampleSource`] by calling the static
//! `MainActivity.audioBuffer(): FloatArray` once per audio period.
//!
//! The audio callback thread is created by Oboe, not by the JVM, so
//! `FindClass` there only sees system classes. `JNI_OnLoad` therefore
//! caches the application class loader and the callback resolves the
//! activity class through it on first use.

use std::ffi::c_void;

use jni::objects::{GlobalRef, JClass, JFloatArray, JIntArray, JStaticMethodID, JValue};
use jni::signature::ReturnType;
use jni::sys::{jint, JNI_ERR, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use log::{info, warn};
use once_cell::sync::{Lazy, OnceCell};

use crate::audio::backend::OboeBackend;
use crate::audio::engine::AudioEngine;
use crate::audio::source::{RetryGate, SampleSource};
use crate::config::{AppConfig, BridgeConfig};
use crate::error::{log_audio_error, AudioError};
use crate::managers::AudioEngineManager;

static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::load_android);
static JVM: OnceCell<JavaVM> = OnceCell::new();
static CLASS_LOADER: OnceCell<GlobalRef> = OnceCell::new();
static BUFFER_METHOD: OnceCell<BufferMethod> = OnceCell::new();
static ENGINE: Lazy<AudioEngineManager<OboeBackend>> = Lazy::new(|| {
    AudioEngineManager::new(AudioEngine::new(OboeBackend::new(), CONFIG.audio.clone()))
});

/// Activity class and its static buffer method, resolved once per process
type BufferMethod = (GlobalRef, JStaticMethodID);

fn jni_error(err: jni::errors::Error) -> AudioError {
    AudioError::JniFailure {
        reason: err.to_string(),
    }
}

/// Clear a pending Java exception so later JNI calls on this thread work
fn clear_exception(env: &mut JNIEnv) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// Initialize Android logging
fn init_logging(config: &AppConfig) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(config.logging.level_filter())
            .with_tag(config.logging.tag.as_str()),
    );
}

/// JNI_OnLoad is called when the native library is loaded by Android
///
/// Stores the JavaVM and caches a global reference to the activity's class
/// loader for use from the audio callback thread. Only a missing JNIEnv fails
/// the load; a loader lookup failure is logged and the engine later refuses
/// to start.
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    init_logging(&CONFIG);
    info!("JNI_OnLoad called - caching class loader");

    {
        let mut env = match vm.get_env() {
            Ok(env) => env,
            Err(err) => {
                log_audio_error(&jni_error(err), "JNI_OnLoad");
                return JNI_ERR;
            }
        };
        match class_loader_of(&mut env, &CONFIG.bridge) {
            Ok(loader) => {
                let _ = CLASS_LOADER.set(loader);
            }
            Err(err) => {
                log_audio_error(&err, "JNI_OnLoad");
                clear_exception(&mut env);
            }
        }
    }
    let _ = JVM.set(vm);
    JNI_VERSION_1_6
}

/// Global reference to the class loader that loaded the activity class
fn class_loader_of(env: &mut JNIEnv, bridge: &BridgeConfig) -> Result<GlobalRef, AudioError> {
    env.with_local_frame(4, |env| -> jni::errors::Result<GlobalRef> {
        let activity = env.find_class(bridge.activity_class.as_str())?;
        let loader = env
            .call_method(&activity, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?
            .l()?;
        env.new_global_ref(loader)
    })
    .map_err(jni_error)
}

/// Load the buffer class through `loader` and look up its static method
///
/// Runs inside its own local frame: the class name and class refs are freed
/// on every exit, which matters on a permanently attached thread.
fn lookup_buffer_method(
    env: &mut JNIEnv,
    loader: &GlobalRef,
    bridge: &BridgeConfig,
) -> Result<BufferMethod, AudioError> {
    env.with_local_frame(4, |env| -> jni::errors::Result<BufferMethod> {
        let name = env.new_string(bridge.activity_class_dotted())?;
        let class = env
            .call_method(
                loader.as_obj(),
                "loadClass",
                "(Ljava/lang/String;)Ljava/lang/Class;",
                &[JValue::Object(&name)],
            )?
            .l()?;
        let class = JClass::from(class);
        let method = env.get_static_method_id(
            &class,
            bridge.buffer_method.as_str(),
            bridge.buffer_method_signature.as_str(),
        )?;
        Ok((env.new_global_ref(&class)?, method))
    })
    .map_err(jni_error)
}

/// Sample source that pulls each period's buffer from the JVM
///
/// The activity class and buffer method are resolved on the first call, on
/// the callback thread, and cached in [`BUFFER_METHOD`] for the life of the
/// process. Failed lookups are retried at most once per
/// `lookup_retry_periods` periods.
pub struct JvmSampleSource {
    vm: &'static JavaVM,
    class_loader: &'static GlobalRef,
    bridge: BridgeConfig,
    retry: RetryGate,
    scratch: Vec<f32>,
}

impl JvmSampleSource {
    /// Build a source from the state cached by `JNI_OnLoad`
    ///
    /// # Arguments
    /// * `bridge` - Class and method to call for each buffer
    /// * `capacity` - Largest buffer accepted per period, in samples
    pub fn new(bridge: BridgeConfig, capacity: usize) -> Result<Self, AudioError> {
        let vm = JVM.get().ok_or_else(|| AudioError::JniFailure {
            reason: "JNI_OnLoad has not cached the JavaVM".to_string(),
        })?;
        let class_loader = CLASS_LOADER.get().ok_or_else(|| AudioError::JniFailure {
            reason: format!("No class loader cached for {}", bridge.activity_class),
        })?;
        Ok(Self {
            vm,
            class_loader,
            retry: RetryGate::new(bridge.lookup_retry_periods),
            bridge,
            scratch: vec![0.0; capacity.max(1)],
        })
    }

    fn resolve(&mut self, env: &mut JNIEnv) -> Result<&'static BufferMethod, AudioError> {
        if let Some(resolved) = BUFFER_METHOD.get() {
            return Ok(resolved);
        }
        if !self.retry.ready() {
            return Err(AudioError::JniFailure {
                reason: format!(
                    "{}.{} unresolved, waiting before next lookup",
                    self.bridge.activity_class, self.bridge.buffer_method
                ),
            });
        }

        let lookup =
            BUFFER_METHOD.get_or_try_init(|| lookup_buffer_method(env, self.class_loader, &self.bridge));
        match lookup {
            Ok(resolved) => {
                self.retry.succeeded();
                info!(
                    "Resolved {}.{}{}",
                    self.bridge.activity_class,
                    self.bridge.buffer_method,
                    self.bridge.buffer_method_signature
                );
                Ok(resolved)
            }
            Err(err) => {
                self.retry.failed();
                Err(err)
            }
        }
    }

    /// Call the buffer method and copy its result into the scratch buffer
    fn fetch(&mut self, env: &mut JNIEnv) -> Result<usize, AudioError> {
        let (class, method) = self.resolve(env)?;
        let method = *method;
        let class: &JClass = class.as_obj().into();

        // SAFETY: `method` was resolved on `class` with a `()[F` signature
        // and is called with no arguments.
        let value = unsafe { env.call_static_method_unchecked(class, method, ReturnType::Array, &[]) }
            .and_then(|value| value.l())
            .map_err(jni_error)?;
        if value.is_null() {
            return Ok(0);
        }

        let array = JFloatArray::from(value);
        let result = self.copy_array(env, &array);
        let _ = env.delete_local_ref(array);
        result
    }

    fn copy_array(&mut self, env: &mut JNIEnv, array: &JFloatArray) -> Result<usize, AudioError> {
        let length = env.get_array_length(array).map_err(jni_error)?;
        let length = usize::try_from(length)
            .unwrap_or(0)
            .min(self.scratch.len());
        env.get_float_array_region(array, 0, &mut self.scratch[..length])
            .map_err(jni_error)?;
        Ok(length)
    }
}

impl SampleSource for JvmSampleSource {
    // The JVM hands over whole buffers; the period size is not needed
    fn next_buffer(&mut self, _frames: usize) -> Result<&[f32], AudioError> {
        let mut env = self
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| AudioError::ThreadAttachFailed {
                reason: e.to_string(),
            })?;

        match self.fetch(&mut env) {
            Ok(length) => Ok(&self.scratch[..length]),
            Err(err) => {
                clear_exception(&mut env);
                Err(err)
            }
        }
    }
}

/// Copy a Java `int[]` of core ids, dropping negative entries
fn read_cpu_ids(env: &mut JNIEnv, cpu_ids: &JIntArray) -> Result<Vec<usize>, AudioError> {
    if cpu_ids.is_null() {
        return Ok(Vec::new());
    }

    let length = env.get_array_length(cpu_ids).map_err(jni_error)?;
    let mut raw = vec![0; usize::try_from(length).unwrap_or(0)];
    if !raw.is_empty() {
        env.get_int_array_region(cpu_ids, 0, &mut raw)
            .map_err(jni_error)?;
    }

    Ok(raw
        .into_iter()
        .filter_map(|id| match usize::try_from(id) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring negative CPU ID {}", id);
                None
            }
        })
        .collect())
}

#[no_mangle]
pub extern "system" fn Java_com_felipecsl_knes_JniKt_startAudioEngine(
    mut env: JNIEnv,
    _class: JClass,
    cpu_ids: JIntArray,
) {
    let cpu_ids = read_cpu_ids(&mut env, &cpu_ids).unwrap_or_else(|err| {
        log_audio_error(&err, "startAudioEngine");
        clear_exception(&mut env);
        Vec::new()
    });

    let source = match JvmSampleSource::new(CONFIG.bridge.clone(), CONFIG.audio.buffer_capacity) {
        Ok(source) => source,
        Err(err) => {
            log_audio_error(&err, "startAudioEngine");
            return;
        }
    };

    let _ = ENGINE.start(cpu_ids, Box::new(source));
}

#[no_mangle]
pub extern "system" fn Java_com_felipecsl_knes_JniKt_stopAudioEngine(_env: JNIEnv, _class: JClass) {
    let _ = ENGINE.stop();
}

#[no_mangle]
pub extern "system" fn Java_com_felipecsl_knes_JniKt_pauseAudioEngine(_env: JNIEnv, _class: JClass) {
    let _ = ENGINE.pause();
}

#[no_mangle]
pub extern "system" fn Java_com_felipecsl_knes_JniKt_resumeAudioEngine(_env: JNIEnv, _class: JClass) {
    let _ = ENGINE.resume();
}
