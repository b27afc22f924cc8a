// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Interrupt controller seam and the EL3 GICv3 driver.
//!
//! Distributor bring-up and per-core interface setup come from
//! `arm-gic-driver`. [`GicContextRegs`] adds what a power-island cycle
//! needs on top: saving and restoring distributor and redistributor state,
//! and the redistributor sleep handshake.

use core::{mem::size_of, time::Duration};

use tock_registers::{
    LocalRegisterCopy,
    fields::FieldValue,
    interfaces::{ReadWriteable, Readable, Writeable},
    register_bitfields, register_structs,
    registers::ReadWrite,
};

use crate::{
    mmio::MmioDeref,
    timer::{Clock, PollBudget, poll_until},
};

/// Number of interrupt lines covered by saved context.
pub const GIC_MAX_LINES: usize = 512;
/// Number of 32-line enable banks.
pub const GIC_BANKS: usize = GIC_MAX_LINES / 32;
/// First shared peripheral interrupt.
pub const GIC_SPI_BASE: usize = 32;
const GIC_SPI_COUNT: usize = GIC_MAX_LINES - GIC_SPI_BASE;

register_bitfields! [u32,
    GICD_CTLR [
        ENABLE_G0 OFFSET(0) NUMBITS(1) [],
        ENABLE_G1NS OFFSET(1) NUMBITS(1) [],
        ENABLE_G1S OFFSET(2) NUMBITS(1) [],
        ARE_S OFFSET(4) NUMBITS(1) [],
        ARE_NS OFFSET(5) NUMBITS(1) [],
        DS OFFSET(6) NUMBITS(1) [],
        RWP OFFSET(31) NUMBITS(1) []
    ],
    GICR_CTLR [
        RWP OFFSET(3) NUMBITS(1) []
    ],
    GICR_WAKER [
        PROCESSOR_SLEEP OFFSET(1) NUMBITS(1) [],
        CHILDREN_ASLEEP OFFSET(2) NUMBITS(1) []
    ]
];

register_structs! {
    /// Distributor frame up to the end of the routing registers.
    DistRegs {
        (0x0000 => ctlr: ReadWrite<u32, GICD_CTLR::Register>),
        (0x0004 => _reserved0),
        (0x0080 => igroupr: [ReadWrite<u32>; 32]),
        (0x0100 => isenabler: [ReadWrite<u32>; 32]),
        (0x0180 => icenabler: [ReadWrite<u32>; 32]),
        (0x0200 => _reserved1),
        (0x0400 => ipriorityr: [ReadWrite<u32>; 256]),
        (0x0800 => _reserved2),
        (0x0c00 => icfgr: [ReadWrite<u32>; 64]),
        (0x0d00 => igrpmodr: [ReadWrite<u32>; 32]),
        (0x0d80 => _reserved3),
        (0x6000 => irouter: [ReadWrite<u64>; 1024]),
        (0x8000 => @END),
    }
}

register_structs! {
    /// One redistributor: the RD frame followed by the SGI frame.
    RedistRegs {
        (0x0_0000 => ctlr: ReadWrite<u32, GICR_CTLR::Register>),
        (0x0_0004 => _reserved0),
        (0x0_0014 => waker: ReadWrite<u32, GICR_WAKER::Register>),
        (0x0_0018 => _reserved1),
        (0x1_0080 => igroupr0: ReadWrite<u32>),
        (0x1_0084 => _reserved2),
        (0x1_0100 => isenabler0: ReadWrite<u32>),
        (0x1_0104 => _reserved3),
        (0x1_0180 => icenabler0: ReadWrite<u32>),
        (0x1_0184 => _reserved4),
        (0x1_0400 => ipriorityr: [ReadWrite<u32>; 8]),
        (0x1_0420 => _reserved5),
        (0x1_0c00 => icfgr: [ReadWrite<u32>; 2]),
        (0x1_0c08 => _reserved6),
        (0x1_0d00 => igrpmodr0: ReadWrite<u32>),
        (0x1_0d04 => _reserved7),
        (0x2_0000 => @END),
    }
}

fn groups_off() -> FieldValue<u32, GICD_CTLR::Register> {
    GICD_CTLR::ENABLE_G0::CLEAR + GICD_CTLR::ENABLE_G1NS::CLEAR + GICD_CTLR::ENABLE_G1S::CLEAR
}

/// What power management needs from the interrupt controller.
pub trait InterruptController {
    /// Saved controller state carried across a power-island cycle.
    type Context: Default;

    /// Captures distributor and redistributor state.
    fn save(&mut self, ctx: &mut Self::Context);
    /// Restores state captured by [`InterruptController::save`].
    fn restore(&mut self, ctx: &Self::Context);
    /// Programs the per-core redistributor defaults of `core`. Runs on
    /// `core` itself.
    fn pcpu_init(&mut self, core: usize);
    /// Wakes the redistributor of `core` and enables its CPU interface.
    fn cpuif_enable(&mut self, core: usize);
    /// Disables the CPU interface of `core` and lets its redistributor sleep.
    fn cpuif_disable(&mut self, core: usize);
    /// Returns the set-enable mask of the 32-line `bank`.
    fn enable_mask(&self, bank: usize) -> u32;
    /// Disables every interrupt group at the distributor.
    fn disable_all_groups(&mut self);
}

/// Saved per-core redistributor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdistContext {
    pub ctlr: u32,
    pub igroupr0: u32,
    pub igrpmodr0: u32,
    pub isenabler0: u32,
    pub icfgr: [u32; 2],
    pub ipriorityr: [u32; 8],
}

impl RdistContext {
    const fn new() -> Self {
        Self {
            ctlr: 0,
            igroupr0: 0,
            igrpmodr0: 0,
            isenabler0: 0,
            icfgr: [0; 2],
            ipriorityr: [0; 8],
        }
    }
}

/// Saved distributor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistContext {
    pub ctlr: u32,
    pub igroupr: [u32; GIC_BANKS],
    pub igrpmodr: [u32; GIC_BANKS],
    pub isenabler: [u32; GIC_BANKS],
    pub icfgr: [u32; GIC_MAX_LINES / 16],
    pub ipriorityr: [u32; GIC_MAX_LINES / 4],
    pub irouter: [u64; GIC_SPI_COUNT],
}

impl DistContext {
    const fn new() -> Self {
        Self {
            ctlr: 0,
            igroupr: [0; GIC_BANKS],
            igrpmodr: [0; GIC_BANKS],
            isenabler: [0; GIC_BANKS],
            icfgr: [0; GIC_MAX_LINES / 16],
            ipriorityr: [0; GIC_MAX_LINES / 4],
            irouter: [0; GIC_SPI_COUNT],
        }
    }
}

/// Full GICv3 context for `N` cores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gicv3Context<const N: usize> {
    pub dist: DistContext,
    pub rdist: [RdistContext; N],
}

impl<const N: usize> Default for Gicv3Context<N> {
    fn default() -> Self {
        Self {
            dist: DistContext::new(),
            rdist: [RdistContext::new(); N],
        }
    }
}

/// Distributor and redistributor registers of a GICv3 with `N` cores.
///
/// SGIs and PPIs are saved per redistributor; the distributor copies of
/// banks 0 (and the matching ICFGR and IPRIORITYR words) are not used.
pub struct GicContextRegs<K: Clock, const N: usize> {
    gicd: MmioDeref<DistRegs>,
    gicr: usize,
    clock: K,
    budget: PollBudget,
}

impl<K: Clock, const N: usize> GicContextRegs<K, N> {
    /// Wraps the distributor at `gicd` and `N` redistributors from `gicr`.
    ///
    /// # Safety
    ///
    /// Both regions must be mapped and laid out as a GICv3 distributor and
    /// `N` contiguous redistributors.
    pub const unsafe fn new(clock: K, gicd: usize, gicr: usize) -> Self {
        Self {
            // SAFETY: guaranteed by the caller.
            gicd: unsafe { MmioDeref::new(gicd) },
            gicr,
            clock,
            budget: PollBudget::Within(Duration::from_millis(10)),
        }
    }

    /// Overrides the budget used for RWP and waker polls.
    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    fn rdist(&self, core: usize) -> MmioDeref<RedistRegs> {
        debug_assert!(core < N);
        // SAFETY: `new` covers `N` redistributors from `gicr`.
        unsafe { MmioDeref::new(self.gicr + core * size_of::<RedistRegs>()) }
    }

    fn wait_dist_rwp(&self) {
        if poll_until(&self.clock, self.budget, || !self.gicd.ctlr.is_set(GICD_CTLR::RWP)).is_err() {
            warn!("GICD RWP stuck");
        }
    }

    fn wait_rdist_rwp(&self, core: usize) {
        let rd = self.rdist(core);
        if poll_until(&self.clock, self.budget, || !rd.ctlr.is_set(GICR_CTLR::RWP)).is_err() {
            warn!("GICR{core} RWP stuck");
        }
    }

    /// Clears `ProcessorSleep` and waits for the redistributor to wake.
    pub fn rdist_wake(&self, core: usize) {
        let rd = self.rdist(core);
        rd.waker.modify(GICR_WAKER::PROCESSOR_SLEEP::CLEAR);
        if poll_until(&self.clock, self.budget, || {
            !rd.waker.is_set(GICR_WAKER::CHILDREN_ASLEEP)
        })
        .is_err()
        {
            warn!("GICR{core} did not wake");
        }
    }

    /// Sets `ProcessorSleep` and waits for the redistributor to quiesce.
    pub fn rdist_sleep(&self, core: usize) {
        let rd = self.rdist(core);
        rd.waker.modify(GICR_WAKER::PROCESSOR_SLEEP::SET);
        if poll_until(&self.clock, self.budget, || {
            rd.waker.is_set(GICR_WAKER::CHILDREN_ASLEEP)
        })
        .is_err()
        {
            warn!("GICR{core} did not quiesce");
        }
    }

    /// Captures the distributor and every redistributor.
    pub fn save(&self, ctx: &mut Gicv3Context<N>) {
        let gicd = &*self.gicd;
        let d = &mut ctx.dist;
        d.ctlr = gicd.ctlr.get();
        for bank in 1..GIC_BANKS {
            d.igroupr[bank] = gicd.igroupr[bank].get();
            d.igrpmodr[bank] = gicd.igrpmodr[bank].get();
            d.isenabler[bank] = gicd.isenabler[bank].get();
        }
        for (v, r) in d.icfgr.iter_mut().zip(&gicd.icfgr).skip(2) {
            *v = r.get();
        }
        for (v, r) in d.ipriorityr.iter_mut().zip(&gicd.ipriorityr).skip(8) {
            *v = r.get();
        }
        for (v, r) in d.irouter.iter_mut().zip(&gicd.irouter[GIC_SPI_BASE..]) {
            *v = r.get();
        }
        for (core, rctx) in ctx.rdist.iter_mut().enumerate() {
            self.save_rdist(core, rctx);
        }
        debug!("GIC context saved");
    }

    /// Writes back state captured by [`Self::save`].
    pub fn restore(&self, ctx: &Gicv3Context<N>) {
        let gicd = &*self.gicd;
        let d = &ctx.dist;

        // Program with groups disabled, then re-enable with the saved CTLR.
        let mut ctlr = LocalRegisterCopy::<u32, GICD_CTLR::Register>::new(d.ctlr);
        ctlr.modify(groups_off());
        gicd.ctlr.set(ctlr.get());
        self.wait_dist_rwp();
        for bank in 1..GIC_BANKS {
            gicd.igroupr[bank].set(d.igroupr[bank]);
            gicd.igrpmodr[bank].set(d.igrpmodr[bank]);
        }
        for (v, r) in d.icfgr.iter().zip(&gicd.icfgr).skip(2) {
            r.set(*v);
        }
        for (v, r) in d.ipriorityr.iter().zip(&gicd.ipriorityr).skip(8) {
            r.set(*v);
        }
        for (v, r) in d.irouter.iter().zip(&gicd.irouter[GIC_SPI_BASE..]) {
            r.set(*v);
        }
        for bank in 1..GIC_BANKS {
            gicd.isenabler[bank].set(d.isenabler[bank]);
        }
        gicd.ctlr.set(d.ctlr);
        self.wait_dist_rwp();
        for (core, rctx) in ctx.rdist.iter().enumerate() {
            self.restore_rdist(core, rctx);
        }
        debug!("GIC context restored");
    }

    /// Returns the set-enable mask of the 32-line `bank`.
    pub fn enable_mask(&self, bank: usize) -> u32 {
        self.gicd.isenabler[bank].get()
    }

    /// Clears every group enable, keeping affinity routing as configured.
    pub fn disable_all_groups(&self) {
        self.gicd.ctlr.modify(groups_off());
        self.wait_dist_rwp();
    }

    fn save_rdist(&self, core: usize, ctx: &mut RdistContext) {
        let rd = self.rdist(core);
        ctx.ctlr = rd.ctlr.get();
        ctx.igroupr0 = rd.igroupr0.get();
        ctx.igrpmodr0 = rd.igrpmodr0.get();
        ctx.isenabler0 = rd.isenabler0.get();
        for (v, r) in ctx.icfgr.iter_mut().zip(&rd.icfgr) {
            *v = r.get();
        }
        for (v, r) in ctx.ipriorityr.iter_mut().zip(&rd.ipriorityr) {
            *v = r.get();
        }
    }

    fn restore_rdist(&self, core: usize, ctx: &RdistContext) {
        let rd = self.rdist(core);
        rd.icenabler0.set(!0);
        self.wait_rdist_rwp(core);
        rd.igroupr0.set(ctx.igroupr0);
        rd.igrpmodr0.set(ctx.igrpmodr0);
        for (v, r) in ctx.icfgr.iter().zip(&rd.icfgr) {
            r.set(*v);
        }
        for (v, r) in ctx.ipriorityr.iter().zip(&rd.ipriorityr) {
            r.set(*v);
        }
        rd.isenabler0.set(ctx.isenabler0);
        rd.ctlr.set(ctx.ctlr);
        self.wait_rdist_rwp(core);
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        use arm_gic_driver::v3::{Gic, VirtAddr};

        /// GICv3 distributor plus `N` redistributors, driven from EL3.
        pub struct Gicv3<K: Clock, const N: usize> {
            driver: Gic,
            regs: GicContextRegs<K, N>,
        }

        impl<K: Clock, const N: usize> Gicv3<K, N> {
            /// Creates a driver for the distributor at `gicd` and the
            /// redistributor region at `gicr`.
            ///
            /// # Safety
            ///
            /// Both regions must be mapped device memory of a GICv3 with
            /// `N` redistributors.
            pub unsafe fn new(clock: K, gicd: usize, gicr: usize) -> Self {
                Self {
                    // SAFETY: guaranteed by the caller.
                    driver: unsafe { Gic::new(VirtAddr::new(gicd), VirtAddr::new(gicr)) },
                    // SAFETY: guaranteed by the caller.
                    regs: unsafe { GicContextRegs::new(clock, gicd, gicr) },
                }
            }

            /// Overrides the budget used for RWP and waker polls.
            pub fn with_budget(mut self, budget: PollBudget) -> Self {
                self.regs = self.regs.with_budget(budget);
                self
            }

            /// Brings up the distributor. Runs once, on the boot core.
            pub fn init(&mut self) {
                info!("Initialize GICv3...");
                self.driver.init();
            }
        }

        impl<K: Clock, const N: usize> InterruptController for Gicv3<K, N> {
            type Context = Gicv3Context<N>;

            fn save(&mut self, ctx: &mut Self::Context) {
                self.regs.save(ctx);
            }

            fn restore(&mut self, ctx: &Self::Context) {
                self.regs.restore(ctx);
            }

            fn pcpu_init(&mut self, core: usize) {
                let mut cpu = self.driver.cpu_interface();
                let _ = cpu.init_current_cpu();
                cpu.set_eoi_mode(false);
                trace!("GICR{core} initialised");
            }

            fn cpuif_enable(&mut self, core: usize) {
                self.regs.rdist_wake(core);
                sysreg::enable_el3_groups();
            }

            fn cpuif_disable(&mut self, core: usize) {
                sysreg::disable_el3_groups();
                self.regs.rdist_sleep(core);
            }

            fn enable_mask(&self, bank: usize) -> u32 {
                self.regs.enable_mask(bank)
            }

            fn disable_all_groups(&mut self) {
                self.regs.disable_all_groups();
            }
        }

        /// The EL3 views of the CPU interface enables.
        mod sysreg {
            use core::arch::asm;

            const ICC_SRE_SRE: u64 = 1 << 0;
            const ICC_SRE_DFB: u64 = 1 << 1;
            const ICC_SRE_DIB: u64 = 1 << 2;
            const ICC_SRE_EN: u64 = 1 << 3;

            pub fn enable_el3_groups() {
                // SAFETY: EL3 owns the ICC system registers.
                unsafe {
                    let mut sre: u64;
                    // ICC_SRE_EL3
                    asm!("mrs {0}, S3_6_C12_C12_5", out(reg) sre);
                    sre |= ICC_SRE_SRE | ICC_SRE_DFB | ICC_SRE_DIB | ICC_SRE_EN;
                    asm!("msr S3_6_C12_C12_5, {0}", "isb", in(reg) sre);
                    // ICC_IGRPEN1_EL3: EnableGrp1NS | EnableGrp1S
                    asm!("msr S3_6_C12_C12_7, {0}", in(reg) 0b11u64);
                    // ICC_IGRPEN0_EL1
                    asm!("msr S3_0_C12_C12_6, {0}", "isb", in(reg) 1u64);
                }
            }

            pub fn disable_el3_groups() {
                // SAFETY: EL3 owns the ICC system registers.
                unsafe {
                    asm!("msr S3_0_C12_C12_6, {0}", in(reg) 0u64);
                    asm!("msr S3_6_C12_C12_7, {0}", "isb", in(reg) 0u64);
                }
            }
        }
    }
}
