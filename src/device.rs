///! Si570 local oscillator driver

use crate::{
    bus::*, calibration::*, config::*, constants::STARTUP_LO, dividers::*, errors::*, frequency::*,
    legacy, register::*, sequencer::*, shared::*, smooth::{self, Path},
};


/// What the periodic tick is doing
#[derive(Debug,Copy,Clone)]
enum Phase {
    /// `init` not called yet, or failed
    Uninit,
    /// Factory register read-back in flight
    Starting,
    /// Watching for a new request
    Idle,
    /// Choosing between smooth and full retune
    Evaluate,
    /// Looking for new dividers
    Search(DividerSearch),
    /// Registers on their way to the part
    Program,
}


/// Si570 driver.
///
/// Call [`init`](Si570::init) until it stops returning `WouldBlock`, then
/// call [`tick`](Si570::tick) periodically. Frequency requests arrive
/// through the [`SharedState`].
pub struct Si570<'a, BUS> {
    bus: BUS,
    config: Config,
    requests: &'a SharedState,
    seq: Sequencer,
    phase: Phase,
    /// Last request taken from `requests`
    snapshot: Snapshot,
    /// Clamped frequency of the request being applied, MHz
    fout: f64,
    /// What the part runs at, if known
    tuning: Option<Tuning>,
    active: LoWord,
    calibration: Option<Calibration>,
}


impl<'a, BUS> Si570<'a, BUS>
where BUS: Transport,
{
    /// Creates the driver, nothing is sent until `init`.
    pub fn new(
        bus: BUS,
        requests: &'a SharedState,
        config: Config,
    ) -> Self {
        Si570 {
            bus,
            seq: Sequencer::new(&config),
            config,
            requests,
            phase: Phase::Uninit,
            snapshot: Snapshot::STARTUP,
            fout: 0.0,
            tuning: None,
            active: LoWord(STARTUP_LO),
            calibration: None,
        }
    }

    /// Recall the factory registers and read them back.
    ///
    /// Non-blocking, call again while it returns `WouldBlock`. Unless a
    /// calibration was supplied through the shared state beforehand, the
    /// crystal frequency is derived from the factory registers and
    /// published there. Fails with `InitFailed` if the bus gave up.
    pub fn init(self: &mut Self) -> nb::Result<(), Error> {
        match self.phase {
            Phase::Uninit => {
                self.seq.begin_readback()?;
                self.phase = Phase::Starting;
                Err(nb::Error::WouldBlock)
            }
            Phase::Starting => match self.seq.poll(&mut self.bus) {
                Ok(()) => self.finish_init().map_err(|e| {
                    self.phase = Phase::Uninit;
                    nb::Error::Other(e)
                }),
                Err(nb::Error::WouldBlock) => Err(nb::Error::WouldBlock),
                Err(nb::Error::Other(e)) => {
                    error!("si570: factory register read-back failed: {:?}", e);
                    self.phase = Phase::Uninit;
                    Err(nb::Error::Other(Error::InitFailed))
                }
            },
            _ => Ok(()),
        }
    }

    fn finish_init(self: &mut Self) -> Result<(), Error> {
        let calibration = Calibration::new(self.seq.working().ok_or(Error::Busy)?);

        if !self.requests.xtal().is_calibrated() {
            let xtal = calibration.xtal_word(self.config.startup_mhz).map_err(|_| Error::InitFailed)?;
            info!("si570: crystal {} MHz from factory registers {:?}", xtal.mhz(), calibration.factory());
            self.requests.set_xtal(xtal);
        }

        self.calibration = Some(calibration);
        self.requests.take_legacy();
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Periodic work, never blocks.
    ///
    /// Picks up new requests and moves a retune one step further. Failures
    /// are reported once and the driver goes back to waiting for the next
    /// request; the failed request is not retried until it changes.
    pub fn tick(self: &mut Self) -> Result<(), Error> {
        match self.phase {
            Phase::Uninit | Phase::Starting => Err(Error::NotInitialized),
            Phase::Idle => self.poll_requests(),
            Phase::Evaluate => self.evaluate(),
            Phase::Search(mut search) => match search.step() {
                Err(nb::Error::WouldBlock) => {
                    self.phase = Phase::Search(search);
                    Ok(())
                }
                Ok(t) => {
                    debug!("si570: HS_DIV {} N1 {} DCO {} MHz", t.dividers.hsdiv, t.dividers.n1, t.dco);
                    self.program(t, Path::Full.unfreeze())
                }
                Err(nb::Error::Other(e)) => {
                    warn!("si570: no dividers for {} MHz", self.fout);
                    self.abort(e)
                }
            },
            Phase::Program => match self.seq.poll(&mut self.bus) {
                Err(nb::Error::WouldBlock) => Ok(()),
                Ok(()) => {
                    self.active = LoWord::from_mhz(self.fout);
                    self.phase = Phase::Idle;
                    trace!("si570: LO at {} MHz", self.fout);
                    Ok(())
                }
                Err(nb::Error::Other(e)) => {
                    warn!("si570: reprogram failed: {:?}", e);
                    self.abort(e)
                }
            },
        }
    }

    fn poll_requests(self: &mut Self) -> Result<(), Error> {
        if let Some(regs) = self.requests.take_legacy() {
            let lo = legacy::lo_from_registers(self.config.nominal_xtal_mhz, regs);
            debug!("si570: register request {:?} -> {} MHz", regs, lo.mhz());
            self.requests.set_lo(lo);
        }

        let snapshot = self.requests.snapshot();
        if snapshot == self.snapshot {
            return Ok(());
        }
        self.snapshot = snapshot;
        (if snapshot.xtal.is_calibrated() { Ok(()) } else { Err(Error::NotCalibrated) })?;

        self.fout = clamp_lo(snapshot.lo.mhz(), self.config.lo_min_mhz, self.config.lo_max_mhz);
        self.phase = Phase::Evaluate;
        Ok(())
    }

    fn evaluate(self: &mut Self) -> Result<(), Error> {
        match smooth::evaluate(self.tuning.as_ref(), self.fout) {
            Path::Smooth(t) => {
                trace!("si570: smooth tune to {} MHz", self.fout);
                self.program(t, Path::Smooth(t).unfreeze())
            }
            Path::Full => {
                self.phase = Phase::Search(DividerSearch::new(self.fout));
                Ok(())
            }
        }
    }

    fn program(self: &mut Self, t: Tuning, unfreeze: u8) -> Result<(), Error> {
        let rfreq = t.dco / self.snapshot.xtal.mhz();
        if rfreq > RFREQ_MAX {
            warn!("si570: RFREQ {} out of range for crystal {} MHz", rfreq, self.snapshot.xtal.mhz());
            return self.abort(Error::NotCalibrated);
        }

        let regs = Registers::encode(&Settings {
            hsdiv: t.dividers.hsdiv,
            n1: t.dividers.n1,
            rfreq,
        });

        if let Err(e) = self.seq.begin_reprogram(&regs, unfreeze) {
            return self.abort(e);
        }
        self.tuning = Some(t);
        self.phase = Phase::Program;
        Ok(())
    }

    /// Give up on the current request. The part state is unknown, so the
    /// next request takes the full path.
    fn abort(self: &mut Self, e: Error) -> Result<(), Error> {
        self.tuning = None;
        self.phase = Phase::Idle;
        Err(e)
    }

    /// Put the factory registers back into the working buffer without
    /// touching the part. Lets external tooling recompute the crystal
    /// frequency from [`working_registers`](Si570::working_registers).
    pub fn fake_reset(self: &mut Self) -> Result<(), Error> {
        let factory = self.factory_registers().ok_or(Error::NotInitialized)?;
        self.seq.restore(factory)
    }

    /// Registers read back at startup
    pub fn factory_registers(self: &Self) -> Option<[u8; 6]> {
        self.calibration.as_ref().map(|c| c.factory())
    }

    /// Working register buffer, `None` while a bus sequence runs
    pub fn working_registers(self: &Self) -> Option<[u8; 6]> {
        self.seq.working()
    }

    /// Last LO frequency written to the part, after clamping
    #[inline]
    pub fn active(self: &Self) -> LoWord {
        self.active
    }

    /// Last LO frequency written to the part, MHz
    #[inline]
    pub fn applied_mhz(self: &Self) -> f64 {
        self.active.mhz()
    }

    /// Crystal calibration in use
    #[inline]
    pub fn calibration(self: &Self) -> XtalWord {
        self.requests.xtal()
    }

    /// Dividers and DCO frequency currently programmed, if known
    #[inline]
    pub fn tuning(self: &Self) -> Option<Tuning> {
        self.tuning
    }

    /// A request is being worked on
    pub fn is_busy(self: &Self) -> bool {
        match self.phase {
            Phase::Uninit | Phase::Idle => false,
            _ => true,
        }
    }

    /// Give the bus back
    pub fn release(self) -> BUS {
        self.bus
    }
}
